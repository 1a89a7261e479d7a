//! Escrow Module
//!
//! Builds, signs and submits the transaction that opens an escrow, and decodes
//! the escrow account the program writes.

pub mod initializer;
pub mod instruction;
pub mod state;

use serde::{Deserialize, Serialize};

pub use initializer::{fetch_escrow, EscrowInitializer, EscrowSummary, InitEscrowRequest};
pub use instruction::{build_init_escrow_instructions, InitEscrowAccounts, InitEscrowPlan};
pub use state::EscrowRecord;

/// Which flavour of escrow program is deployed.
///
/// - `Anchor`: the program creates the escrow account itself (`init`), instruction
///   data is prefixed by the Anchor sighash and the account by its discriminator.
/// - `Native`: the client creates the escrow account, instruction data is a tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgramKind {
    #[default]
    #[serde(rename = "anchor")]
    Anchor,
    #[serde(rename = "native")]
    Native,
}
