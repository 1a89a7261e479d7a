//! Wallet Connector Module
//!
//! Locates an installed wallet provider, requests a connection and resolves a
//! handle that can sign transactions. Providers announce a successful
//! connection through an event channel; `connect` waits for that event rather
//! than trusting the return of the connect request alone.

pub mod keypair;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::WalletConfig;

pub use keypair::{KeypairWallet, TrustStore};

// ============================================================================
// TYPES
// ============================================================================

/// Notifications emitted by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connect(Pubkey),
    Disconnect,
}

/// Wallet conditions callers may want to match on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet provider installed, get one at {install_url}")]
    NotInstalled { install_url: String },

    #[error("Wallet has not previously trusted this application")]
    NotTrusted,

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Wallet event channel closed before connecting")]
    ConnectClosed,
}

/// Capability surface of a wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether the provider is usable in this environment.
    fn is_installed(&self) -> bool;

    /// Requests a connection. With `only_if_trusted`, succeeds only when the
    /// wallet approved this application before and never prompts.
    async fn connect(&self, only_if_trusted: bool) -> Result<()>;

    /// Public key of the connected account, if connected.
    fn public_key(&self) -> Option<Pubkey>;

    /// Adds the wallet's signature to a (possibly partially signed) transaction.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    /// Subscribes to provider events.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Ordered set of wallet providers available to the client.
pub struct WalletRegistry {
    providers: Vec<Arc<dyn WalletProvider>>,
    install_url: String,
}

impl WalletRegistry {
    pub fn new(install_url: impl Into<String>) -> Self {
        Self {
            providers: Vec::new(),
            install_url: install_url.into(),
        }
    }

    /// Builds a registry holding the configured keypair wallet.
    ///
    /// A key source that cannot be loaded is a configuration error, not a
    /// missing wallet, and is returned as such.
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        let wallet = KeypairWallet::from_config(config).context("Failed to load wallet key")?;
        let mut registry = Self::new(config.install_url.clone());
        registry.register(Arc::new(wallet));
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        self.providers.push(provider);
    }
}

/// Returns the first installed provider.
///
/// # Returns
///
/// * `Ok(Arc<dyn WalletProvider>)` - Installed provider
/// * `Err(WalletError::NotInstalled)` - Nothing installed; the install URL is logged
pub fn get_provider(registry: &WalletRegistry) -> Result<Arc<dyn WalletProvider>> {
    if let Some(provider) = registry.providers.iter().find(|p| p.is_installed()) {
        return Ok(provider.clone());
    }

    warn!("No wallet provider installed, install one from {}", registry.install_url);
    Err(WalletError::NotInstalled {
        install_url: registry.install_url.clone(),
    }
    .into())
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Handle to a connected wallet.
#[derive(Clone)]
pub struct ConnectedWallet {
    provider: Arc<dyn WalletProvider>,
    public_key: Pubkey,
}

impl ConnectedWallet {
    pub fn public_key(&self) -> Pubkey {
        self.public_key
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        self.provider.sign_transaction(transaction).await
    }
}

/// Locates a provider and connects to it with a prompt.
pub async fn init(registry: &WalletRegistry) -> Result<ConnectedWallet> {
    let provider = get_provider(registry)?;
    connect(provider, false).await
}

/// Connects to `provider` and waits for its connect event.
///
/// The subscription is taken before the request so the event cannot be missed.
pub async fn connect(
    provider: Arc<dyn WalletProvider>,
    only_if_trusted: bool,
) -> Result<ConnectedWallet> {
    let mut events = provider.subscribe();
    provider.connect(only_if_trusted).await?;

    loop {
        match events.recv().await {
            Ok(WalletEvent::Connect(public_key)) => {
                info!("connected! {} via {}", public_key, provider.name());
                return Ok(ConnectedWallet {
                    provider,
                    public_key,
                });
            }
            Ok(WalletEvent::Disconnect) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => {
                return Err(WalletError::ConnectClosed.into());
            }
        }
    }
}
