//! Solana SVM RPC Client Module
//!
//! This module provides a minimal JSON-RPC client covering the calls the escrow
//! initialization sequence needs: parsed token account lookup, rent-exemption
//! queries, blockhash lookup, raw transaction submission and account fetch.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::config::{Commitment, RpcConfig};

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// Wrapper for results that carry a `context` alongside the `value`.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct SvmRpcClient {
    client: Client,
    rpc_url: String,
    commitment: Commitment,
    skip_preflight: bool,
}

impl SvmRpcClient {
    /// Creates a new RPC client.
    ///
    /// # Arguments
    ///
    /// * `config` - RPC connection settings
    ///
    /// # Returns
    ///
    /// * `Ok(SvmRpcClient)` - Initialized client
    /// * `Err(anyhow::Error)` - HTTP client could not be built
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            commitment: config.commitment,
            skip_preflight: config.skip_preflight,
        })
    }

    /// Looks up an SPL token account with `jsonParsed` encoding and returns its mint.
    ///
    /// # Returns
    ///
    /// * `Ok(Pubkey)` - Mint of the token account
    /// * `Err(anyhow::Error)` - Account missing, not a token account, or RPC failure
    pub async fn get_token_account_mint(&self, token_account: &Pubkey) -> Result<Pubkey> {
        let params = serde_json::json!([
            token_account.to_string(),
            { "encoding": "jsonParsed", "commitment": self.commitment.as_str() }
        ]);

        let result: RpcResponse<Option<serde_json::Value>> =
            self.call("getAccountInfo", params).await?;

        let account = result
            .value
            .ok_or_else(|| anyhow::anyhow!("Token account {} not found", token_account))?;

        let mint = account
            .get("data")
            .and_then(|d| d.get("parsed"))
            .and_then(|p| p.get("info"))
            .and_then(|i| i.get("mint"))
            .and_then(|m| m.as_str())
            .ok_or_else(|| {
                anyhow::anyhow!("Account {} is not a parsed SPL token account", token_account)
            })?;

        Pubkey::from_str(mint).context("Invalid mint in parsed token account")
    }

    /// Returns the lamports needed for an account of `data_len` bytes to be rent exempt.
    pub async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        let params = serde_json::json!([
            data_len,
            { "commitment": self.commitment.as_str() }
        ]);
        self.call("getMinimumBalanceForRentExemption", params).await
    }

    /// Fetches the latest blockhash.
    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        let params = serde_json::json!([{ "commitment": self.commitment.as_str() }]);
        let result: RpcResponse<RpcBlockhash> = self.call("getLatestBlockhash", params).await?;
        Hash::from_str(&result.value.blockhash).context("Invalid blockhash in RPC response")
    }

    /// Submits a fully signed transaction and returns its signature.
    ///
    /// The transaction is bincode-serialized and sent base64 encoded. Preflight
    /// runs unless `skip_preflight` is configured.
    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let wire = bincode::serialize(transaction).context("Failed to serialize transaction")?;
        debug!("Serialized transaction: {} bytes", wire.len());

        let params = serde_json::json!([
            STANDARD.encode(wire),
            {
                "encoding": "base64",
                "skipPreflight": self.skip_preflight,
                "preflightCommitment": self.commitment.as_str()
            }
        ]);

        let signature: String = self.call("sendTransaction", params).await?;
        Signature::from_str(&signature).context("Invalid signature in sendTransaction response")
    }

    /// Fetches raw account data.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Vec<u8>))` - Account data
    /// * `Ok(None)` - Account does not exist
    /// * `Err(anyhow::Error)` - RPC or decoding failure
    pub async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>> {
        let params = serde_json::json!([
            pubkey.to_string(),
            { "encoding": "base64", "commitment": self.commitment.as_str() }
        ]);

        let result: RpcResponse<Option<RpcAccount>> = self.call("getAccountInfo", params).await?;

        let Some(account) = result.value else {
            return Ok(None);
        };

        let data = STANDARD
            .decode(&account.data.0)
            .context("Failed to decode base64 account data")?;
        Ok(Some(data))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call {}", method))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = response.error {
            return Err(anyhow::anyhow!("SVM RPC error: {}", error.message));
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("Missing {} result", method))
    }
}
