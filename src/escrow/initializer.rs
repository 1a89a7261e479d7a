//! Escrow Initializer
//!
//! Runs the client side of opening an escrow: look up the deposit mint, price
//! the new accounts, build the instruction chain, collect signatures, submit,
//! wait once and read back the escrow account.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::instruction::{
    build_init_escrow_instructions, InitEscrowAccounts, InitEscrowPlan, TOKEN_ACCOUNT_LEN,
};
use super::state::{escrow_account_len, EscrowRecord};
use super::ProgramKind;
use crate::config::EscrowClientConfig;
use crate::svm_client::SvmRpcClient;
use crate::wallet::ConnectedWallet;

// ============================================================================
// TYPES
// ============================================================================

/// Inputs for opening an escrow. Keys are base58 strings as typed by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitEscrowRequest {
    /// Initializer's token account holding the tokens to deposit
    pub source_token_account: String,
    /// Amount of tokens to move into escrow
    pub amount: u64,
    /// Initializer's token account that should receive the counter-asset
    pub receiving_token_account: String,
    /// Counter-amount the initializer expects
    pub expected_amount: u64,
    /// Escrow program id
    pub program_id: String,
}

/// Decoded view of a freshly opened escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSummary {
    pub escrow_account_pubkey: String,
    pub is_initialized: bool,
    pub initializer_account_pubkey: String,
    pub temp_token_account_pubkey: String,
    pub initializer_receiving_token_account: String,
    pub expected_amount: u64,
    pub signature: String,
}

impl EscrowSummary {
    fn from_record(escrow: &Pubkey, record: &EscrowRecord, signature: String) -> Self {
        Self {
            escrow_account_pubkey: escrow.to_string(),
            is_initialized: record.is_initialized,
            initializer_account_pubkey: record.initializer_pubkey.to_string(),
            temp_token_account_pubkey: record.tmp_token_account_pubkey.to_string(),
            initializer_receiving_token_account: record
                .initializer_token_to_receive_account_pubkey
                .to_string(),
            expected_amount: record.expected_amount,
            signature,
        }
    }
}

// ============================================================================
// INITIALIZER
// ============================================================================

pub struct EscrowInitializer {
    rpc: SvmRpcClient,
    wallet: ConnectedWallet,
    kind: ProgramKind,
    settle_delay: Duration,
}

impl EscrowInitializer {
    pub fn new(
        rpc: SvmRpcClient,
        wallet: ConnectedWallet,
        kind: ProgramKind,
        settle_delay: Duration,
    ) -> Self {
        Self {
            rpc,
            wallet,
            kind,
            settle_delay,
        }
    }

    /// Builds an initializer from config around an already connected wallet.
    pub fn from_config(config: &EscrowClientConfig, wallet: ConnectedWallet) -> Result<Self> {
        let rpc = SvmRpcClient::new(&config.rpc)?;
        Ok(Self::new(
            rpc,
            wallet,
            config.escrow.program_kind,
            Duration::from_millis(config.escrow.settle_delay_ms),
        ))
    }

    /// Opens an escrow and returns the decoded escrow account.
    ///
    /// # Arguments
    ///
    /// * `request` - Deposit source, amounts, receiving account and program id
    ///
    /// # Returns
    ///
    /// * `Ok(EscrowSummary)` - Escrow opened and read back
    /// * `Err(anyhow::Error)` - Invalid input, RPC/wallet failure, or the escrow
    ///   account could not be read after the settle delay
    pub async fn init_escrow(&self, request: &InitEscrowRequest) -> Result<EscrowSummary> {
        let program_id = parse_pubkey(&request.program_id, "program_id")?;
        let source_token_account =
            parse_pubkey(&request.source_token_account, "source_token_account")?;
        let receiving_token_account =
            parse_pubkey(&request.receiving_token_account, "receiving_token_account")?;
        let initializer = self.wallet.public_key();

        let mint = self
            .rpc
            .get_token_account_mint(&source_token_account)
            .await
            .context("Failed to look up the source token account mint")?;

        let token_account_rent = self
            .rpc
            .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN)
            .await
            .context("Failed to query token account rent")?;

        let escrow_account_rent = match self.kind {
            ProgramKind::Native => Some(
                self.rpc
                    .get_minimum_balance_for_rent_exemption(escrow_account_len(self.kind))
                    .await
                    .context("Failed to query escrow account rent")?,
            ),
            ProgramKind::Anchor => None,
        };

        let temp_token_account = Keypair::new();
        let escrow_account = Keypair::new();

        let plan = InitEscrowPlan {
            program_id,
            kind: self.kind,
            accounts: InitEscrowAccounts {
                initializer,
                source_token_account,
                mint,
                temp_token_account: temp_token_account.pubkey(),
                escrow_account: escrow_account.pubkey(),
                receiving_token_account,
            },
            amount: request.amount,
            expected_amount: request.expected_amount,
            token_account_rent,
            escrow_account_rent,
        };
        let instructions = build_init_escrow_instructions(&plan)?;

        info!("tempTokenAccount {}", temp_token_account.pubkey());
        info!("escrowAccount {}", escrow_account.pubkey());

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .context("Failed to get latest blockhash")?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&initializer));
        transaction
            .try_partial_sign(&[&temp_token_account, &escrow_account], blockhash)
            .context("Failed to sign with the new account keypairs")?;

        let signed = self
            .wallet
            .sign_transaction(transaction)
            .await
            .context("Wallet refused to sign the escrow transaction")?;
        if !signed.is_signed() {
            anyhow::bail!("Escrow transaction is missing signatures after wallet signing");
        }

        let signature = self
            .rpc
            .send_transaction(&signed)
            .await
            .context("Failed to submit the escrow transaction")?;
        info!("Sent {}", signature);

        tokio::time::sleep(self.settle_delay).await;

        let record = match fetch_escrow(&self.rpc, self.kind, &escrow_account.pubkey()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Escrow account {} not readable after submission: {:#}",
                    escrow_account.pubkey(),
                    e
                );
                return Err(e.context(format!(
                    "Transaction {} was sent but the escrow account could not be read",
                    signature
                )));
            }
        };

        Ok(EscrowSummary::from_record(
            &escrow_account.pubkey(),
            &record,
            signature.to_string(),
        ))
    }
}

/// Fetches and decodes an escrow account.
///
/// # Returns
///
/// * `Ok(EscrowRecord)` - Decoded escrow state
/// * `Err(anyhow::Error)` - Account missing, RPC failure, or layout mismatch
pub async fn fetch_escrow(
    rpc: &SvmRpcClient,
    kind: ProgramKind,
    escrow_account: &Pubkey,
) -> Result<EscrowRecord> {
    let data = rpc
        .get_account_data(escrow_account)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Escrow account {} not found", escrow_account))?;
    EscrowRecord::decode(kind, &data)
}

fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|_| anyhow::anyhow!("Invalid {} '{}' (expected base58 pubkey)", field, value))
}
