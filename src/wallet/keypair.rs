//! Keypair-backed wallet provider.
//!
//! Signs with a local ed25519 keypair loaded from an env var (base58) or a
//! Solana CLI keypair file. Silent connects are honoured through a small JSON
//! trust store of previously approved public keys.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{WalletError, WalletEvent, WalletProvider};
use crate::config::WalletConfig;

const EVENT_CAPACITY: usize = 16;

// ============================================================================
// TRUST STORE
// ============================================================================

/// JSON file holding the base58 public keys approved for silent connects.
#[derive(Debug, Clone)]
pub struct TrustStore {
    path: PathBuf,
}

impl TrustStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether `pubkey` was approved before. A missing file means nothing is trusted.
    pub fn contains(&self, pubkey: &Pubkey) -> Result<bool> {
        let key = pubkey.to_string();
        Ok(self.read()?.iter().any(|k| *k == key))
    }

    /// Records `pubkey` as approved.
    pub fn insert(&self, pubkey: &Pubkey) -> Result<()> {
        let mut keys = self.read()?;
        let key = pubkey.to_string();
        if keys.contains(&key) {
            return Ok(());
        }
        keys.push(key);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create trust store directory {}", parent.display())
                })?;
            }
        }
        let content = serde_json::to_string_pretty(&keys)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write trust store {}", self.path.display()))
    }

    fn read(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read trust store {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid trust store {}", self.path.display()))
    }
}

// ============================================================================
// PROVIDER
// ============================================================================

pub struct KeypairWallet {
    keypair: Keypair,
    trust_store: TrustStore,
    connected: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, trust_store: TrustStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            keypair,
            trust_store,
            connected: AtomicBool::new(false),
            events,
        }
    }

    /// Loads the keypair named by the wallet config.
    ///
    /// # Returns
    ///
    /// * `Ok(KeypairWallet)` - Wallet with its key loaded, not yet connected
    /// * `Err(anyhow::Error)` - No usable key source, or an invalid key
    ///
    /// A set `private_key_env` var wins; when it is unset the keypair file is used.
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        let env_key = config
            .private_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok().map(|value| (env, value)));

        let keypair = match (env_key, &config.keypair_path) {
            (Some((env, private_key_b58)), _) => keypair_from_base58(&private_key_b58)
                .with_context(|| format!("Failed to decode wallet private key from {}", env))?,
            (None, Some(path)) => read_keypair_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to read keypair file {}: {}", path, e))?,
            (None, None) => match &config.private_key_env {
                Some(env) => anyhow::bail!(
                    "Missing wallet private key env var {} and no keypair_path configured",
                    env
                ),
                None => anyhow::bail!("No wallet key source configured"),
            },
        };

        Ok(Self::new(keypair, TrustStore::new(&config.trust_store_path)))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Drops the connection and notifies subscribers.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(WalletEvent::Disconnect);
        }
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn name(&self) -> &str {
        "keypair"
    }

    fn is_installed(&self) -> bool {
        true
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<()> {
        let pubkey = self.keypair.pubkey();

        if only_if_trusted {
            if !self.trust_store.contains(&pubkey)? {
                debug!("Silent connect refused for untrusted key {}", pubkey);
                return Err(WalletError::NotTrusted.into());
            }
        } else {
            self.trust_store.insert(&pubkey)?;
        }

        self.connected.store(true, Ordering::SeqCst);
        info!("Keypair wallet connected: {}", pubkey);
        // No subscribers is not an error; the event is simply dropped.
        let _ = self.events.send(WalletEvent::Connect(pubkey));
        Ok(())
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then(|| self.keypair.pubkey())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        if !self.is_connected() {
            return Err(WalletError::NotConnected.into());
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .context("Wallet failed to sign transaction")?;
        Ok(transaction)
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Decodes a base58 private key string into a Keypair.
///
/// Solana private keys are 64 bytes (seed + public key) encoded as base58.
pub fn keypair_from_base58(b58: &str) -> Result<Keypair> {
    let bytes = bs58::decode(b58.trim())
        .into_vec()
        .context("Invalid base58 encoding")?;
    Keypair::try_from(bytes.as_slice()).map_err(|e| anyhow::anyhow!("Invalid keypair bytes: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that a base58 secret key round-trips into the same keypair
    #[test]
    fn test_keypair_from_base58() {
        let keypair = Keypair::new();
        let decoded = keypair_from_base58(&keypair.to_base58_string()).expect("decode keypair");
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    /// Test that garbage input is rejected instead of panicking
    #[test]
    fn test_keypair_from_base58_invalid() {
        assert!(keypair_from_base58("not-base58-0OIl").is_err());
        assert!(keypair_from_base58("3yZe7d").is_err());
    }
}
