//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the escrow client.
//! Configuration includes the RPC endpoint, the escrow program and the wallet key source.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::str::FromStr;

use crate::escrow::ProgramKind;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/escrow-client.toml";

/// Env var that overrides the default config file location.
pub const CONFIG_PATH_ENV: &str = "ESCROW_CLIENT_CONFIG_PATH";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all client settings.
///
/// This structure holds configuration for:
/// - Solana JSON-RPC connection (URL, commitment, preflight)
/// - Escrow program (program id, program flavour, settle delay)
/// - Wallet key source and trust store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowClientConfig {
    /// RPC connection settings
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Escrow program settings
    pub escrow: EscrowConfig,
    /// Wallet settings
    pub wallet: WalletConfig,
}

/// Solana JSON-RPC connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL (e.g., "http://localhost:8899")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Commitment used for reads and as the preflight commitment for submission
    #[serde(default)]
    pub commitment: Commitment,
    /// Skip the RPC node's preflight simulation when submitting
    #[serde(default)]
    pub skip_preflight: bool,
}

/// Commitment level passed to the RPC node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Commitment {
    #[serde(rename = "processed")]
    Processed,
    #[default]
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "finalized")]
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// Escrow program settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Program id of the escrow program (base58)
    pub program_id: String,
    /// Which instruction/account layout the program speaks
    #[serde(default)]
    pub program_kind: ProgramKind,
    /// Delay between submitting the transaction and reading back the escrow account
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Wallet key source and trust settings.
///
/// Either `private_key_env` or `keypair_path` must be set. When both are set the
/// env var wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Env var name holding the wallet's base58 secret key
    #[serde(default)]
    pub private_key_env: Option<String>,
    /// Path to a Solana CLI keypair file (JSON byte array)
    #[serde(default)]
    pub keypair_path: Option<String>,
    /// JSON file listing public keys that were approved for silent connects
    #[serde(default = "default_trust_store_path")]
    pub trust_store_path: String,
    /// Where to send the user when no wallet provider is available
    #[serde(default = "default_install_url")]
    pub install_url: String,
}

fn default_rpc_url() -> String {
    "http://localhost:8899".to_string()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_trust_store_path() -> String {
    "config/trusted_wallets.json".to_string()
}

fn default_install_url() -> String {
    "https://phantom.app/".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: Commitment::default(),
            skip_preflight: false,
        }
    }
}

impl Default for EscrowClientConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            escrow: EscrowConfig {
                program_id: "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS".to_string(),
                program_kind: ProgramKind::default(),
                settle_delay_ms: default_settle_delay_ms(),
            },
            wallet: WalletConfig {
                private_key_env: Some("ESCROW_WALLET_PRIVATE_KEY".to_string()),
                keypair_path: None,
                trust_store_path: default_trust_store_path(),
                install_url: default_install_url(),
            },
        }
    }
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl EscrowClientConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Path precedence: the `path` argument, then `ESCROW_CLIENT_CONFIG_PATH`,
    /// then `config/escrow-client.toml`.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to config file
    ///
    /// # Returns
    ///
    /// * `Ok(EscrowClientConfig)` - Loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparsable or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/escrow-client.template.toml config/escrow-client.toml\n\
                Then edit config/escrow-client.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: EscrowClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - RPC URL is an http(s) URL
    /// - Escrow program id is a valid base58 pubkey
    /// - Wallet has a key source
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.rpc.rpc_url.starts_with("http://") && !self.rpc.rpc_url.starts_with("https://") {
            anyhow::bail!(
                "Configuration error: rpc_url must be an http(s) URL, got '{}'",
                self.rpc.rpc_url
            );
        }

        self.escrow_program_id()?;

        if self.wallet.private_key_env.is_none() && self.wallet.keypair_path.is_none() {
            anyhow::bail!(
                "Configuration error: [wallet] needs private_key_env or keypair_path"
            );
        }

        Ok(())
    }

    /// Returns the configured escrow program id as a Pubkey.
    pub fn escrow_program_id(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.escrow.program_id).map_err(|_| {
            anyhow::anyhow!(
                "Configuration error: invalid escrow program_id '{}' (expected base58)",
                self.escrow.program_id
            )
        })
    }
}
