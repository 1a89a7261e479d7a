//! Shared test helpers for escrow client tests
//!
//! This module provides constants, config builders and WireMock setups for a
//! mocked Solana JSON-RPC endpoint.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use escrow_client::config::{Commitment, RpcConfig};
use escrow_client::wallet::{self, ConnectedWallet, KeypairWallet, TrustStore};
use serde_json::json;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Rent-exempt minimum the mock RPC returns for every size
pub const DUMMY_RENT_LAMPORTS: u64 = 2_039_280;

/// Valid base58 program id (system program)
pub const DUMMY_ESCROW_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// SPL token program id, owner of parsed token accounts
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

// ============================================================================
// BUILDERS
// ============================================================================

pub fn build_rpc_config(rpc_url: &str) -> RpcConfig {
    RpcConfig {
        rpc_url: rpc_url.to_string(),
        commitment: Commitment::Confirmed,
        skip_preflight: false,
    }
}

/// Trust store path that no other test shares.
pub fn unique_trust_store_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "escrow-client-trust-{}.json",
        Keypair::new().pubkey()
    ))
}

/// Removes a temp file when dropped.
pub struct TempFile(pub PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Fresh keypair wallet whose trust store is removed when the guard drops.
pub fn new_keypair_wallet() -> (Arc<KeypairWallet>, TempFile) {
    let store = TempFile(unique_trust_store_path());
    let wallet = Arc::new(KeypairWallet::new(Keypair::new(), TrustStore::new(&store.0)));
    (wallet, store)
}

/// Connects a fresh keypair wallet with a prompt (non-silent).
pub async fn connected_wallet() -> ConnectedWallet {
    let (provider, _store) = new_keypair_wallet();
    wallet::connect(provider, false)
        .await
        .expect("wallet should connect")
}

// ============================================================================
// MOCK RPC SETUP
// ============================================================================

/// Mounts a `getAccountInfo` jsonParsed response describing an SPL token account.
pub async fn mount_parsed_token_account(
    server: &MockServer,
    token_account: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) {
    let response = json!({
        "jsonrpc": "2.0",
        "result": {
            "context": { "slot": 1 },
            "value": {
                "data": {
                    "parsed": {
                        "info": {
                            "isNative": false,
                            "mint": mint.to_string(),
                            "owner": owner.to_string(),
                            "state": "initialized",
                            "tokenAmount": {
                                "amount": "1000",
                                "decimals": 0,
                                "uiAmount": 1000.0,
                                "uiAmountString": "1000"
                            }
                        },
                        "type": "account"
                    },
                    "program": "spl-token",
                    "space": 165
                },
                "executable": false,
                "lamports": DUMMY_RENT_LAMPORTS,
                "owner": TOKEN_PROGRAM_ID,
                "rentEpoch": 0
            }
        },
        "id": 1
    });

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccountInfo" })))
        .and(body_string_contains("jsonParsed"))
        .and(body_string_contains(token_account.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

pub async fn mount_rent(server: &MockServer, lamports: u64) {
    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({ "method": "getMinimumBalanceForRentExemption" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": lamports,
            "id": 1
        })))
        .mount(server)
        .await;
}

pub async fn mount_latest_blockhash(server: &MockServer, blockhash: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getLatestBlockhash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 1 },
                "value": { "blockhash": blockhash, "lastValidBlockHeight": 150 }
            },
            "id": 1
        })))
        .mount(server)
        .await;
}

pub async fn mount_send_transaction(server: &MockServer, signature: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "sendTransaction" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": signature,
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a base64 `getAccountInfo` response. `None` means the account does not exist.
pub async fn mount_account_data(server: &MockServer, data: Option<&[u8]>) {
    let value = match data {
        Some(bytes) => json!({
            "data": [STANDARD.encode(bytes), "base64"],
            "executable": false,
            "lamports": DUMMY_RENT_LAMPORTS,
            "owner": DUMMY_ESCROW_PROGRAM_ID,
            "rentEpoch": 0
        }),
        None => serde_json::Value::Null,
    };

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccountInfo" })))
        .and(body_string_contains("\"encoding\":\"base64\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "context": { "slot": 2 }, "value": value },
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a JSON-RPC error for `rpc_method`.
pub async fn mount_rpc_error(server: &MockServer, rpc_method: &str, message: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32002, "message": message },
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Returns the JSON bodies of all requests the server received for `rpc_method`.
pub async fn received_calls(server: &MockServer, rpc_method: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
        .filter(|body| body["method"] == rpc_method)
        .collect()
}
