//! Escrow Client
//!
//! Command line front end for connecting a wallet and opening escrows.
//!
//! ## Usage
//!
//! ```bash
//! escrow-client --config config/escrow-client.toml connect
//! escrow-client init-escrow \
//!   --source-token-account <PUBKEY> --amount 100 \
//!   --receiving-token-account <PUBKEY> --expected-amount 50
//! escrow-client get-escrow --escrow-account <PUBKEY>
//! ```
//!
//! The config path can also be set with `ESCROW_CLIENT_CONFIG_PATH`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use escrow_client::{
    config::EscrowClientConfig,
    escrow::{fetch_escrow, EscrowInitializer, InitEscrowRequest},
    svm_client::SvmRpcClient,
    wallet::{self, WalletRegistry},
};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "escrow-client")]
#[command(about = "Connect a wallet and open token escrows")]
struct Args {
    /// Path to configuration file (default: config/escrow-client.toml or ESCROW_CLIENT_CONFIG_PATH)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the configured wallet and print its public key
    Connect {
        /// Only connect if the wallet approved this client before
        #[arg(long)]
        only_if_trusted: bool,
    },
    /// Move tokens into a new escrow
    InitEscrow {
        #[arg(long)]
        source_token_account: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        receiving_token_account: String,
        #[arg(long)]
        expected_amount: u64,
        /// Overrides the configured escrow program id
        #[arg(long)]
        program_id: Option<String>,
    },
    /// Read and decode an escrow account
    GetEscrow {
        #[arg(long)]
        escrow_account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let config = EscrowClientConfig::load_from_path(args.config.as_deref())?;
    info!("Configuration loaded, RPC: {}", config.rpc.rpc_url);

    match args.command {
        Command::Connect { only_if_trusted } => {
            let registry = WalletRegistry::from_config(&config.wallet)?;
            let provider = wallet::get_provider(&registry)?;
            let connected = wallet::connect(provider, only_if_trusted).await?;
            println!("{}", connected.public_key());
        }
        Command::InitEscrow {
            source_token_account,
            amount,
            receiving_token_account,
            expected_amount,
            program_id,
        } => {
            let registry = WalletRegistry::from_config(&config.wallet)?;
            let connected = wallet::init(&registry).await?;
            let initializer = EscrowInitializer::from_config(&config, connected)?;

            let request = InitEscrowRequest {
                source_token_account,
                amount,
                receiving_token_account,
                expected_amount,
                program_id: program_id.unwrap_or_else(|| config.escrow.program_id.clone()),
            };
            let summary = initializer.init_escrow(&request).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::GetEscrow { escrow_account } => {
            let escrow_account = Pubkey::from_str(&escrow_account)
                .context("Invalid escrow account (expected base58 pubkey)")?;
            let rpc = SvmRpcClient::new(&config.rpc)?;
            let record = fetch_escrow(&rpc, config.escrow.program_kind, &escrow_account).await?;
            println!("is_initialized: {}", record.is_initialized);
            println!("initializer: {}", record.initializer_pubkey);
            println!("temp token account: {}", record.tmp_token_account_pubkey);
            println!(
                "receiving token account: {}",
                record.initializer_token_to_receive_account_pubkey
            );
            println!("expected amount: {}", record.expected_amount);
        }
    }

    Ok(())
}
