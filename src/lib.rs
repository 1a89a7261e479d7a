//! Escrow Client Library
//!
//! Connects to a wallet provider and opens token escrows on an escrow program
//! by building, signing and submitting the initialization transaction. The
//! escrow rules themselves are enforced on-chain; this crate only drives the
//! client side of the call sequence.

pub mod config;
pub mod escrow;
pub mod svm_client;
pub mod wallet;

// Re-export commonly used types
pub use config::{Commitment, EscrowClientConfig, EscrowConfig, RpcConfig, WalletConfig};
pub use escrow::{
    fetch_escrow, EscrowInitializer, EscrowRecord, EscrowSummary, InitEscrowRequest, ProgramKind,
};
pub use svm_client::SvmRpcClient;
pub use wallet::{
    ConnectedWallet, KeypairWallet, TrustStore, WalletError, WalletEvent, WalletProvider,
    WalletRegistry,
};
