//! Escrow account layout and decoding.

use anyhow::{Context, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;

use super::ProgramKind;

/// Packed size of the escrow record: is_initialized(1) + 3 pubkeys(96) + expected_amount(8).
pub const ESCROW_RECORD_LEN: usize = 1 + 32 + 32 + 32 + 8;

/// Length of an Anchor account or instruction discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Escrow state as written by the on-chain program.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecord {
    pub is_initialized: bool,
    pub initializer_pubkey: Pubkey,
    pub tmp_token_account_pubkey: Pubkey,
    pub initializer_token_to_receive_account_pubkey: Pubkey,
    pub expected_amount: u64,
}

impl EscrowRecord {
    /// Decodes account data for the given program flavour.
    ///
    /// Anchor accounts start with the `account:Escrow` discriminator, which is
    /// checked. Trailing bytes past the record are ignored.
    pub fn decode(kind: ProgramKind, data: &[u8]) -> Result<Self> {
        let body = match kind {
            ProgramKind::Anchor => {
                if data.len() < DISCRIMINATOR_LEN {
                    anyhow::bail!("Escrow account data too short: {} bytes", data.len());
                }
                let (discriminator, rest) = data.split_at(DISCRIMINATOR_LEN);
                if discriminator != escrow_account_discriminator() {
                    anyhow::bail!("Account discriminator does not match Escrow");
                }
                rest
            }
            ProgramKind::Native => data,
        };

        if body.len() < ESCROW_RECORD_LEN {
            anyhow::bail!(
                "Escrow account data too short: expected {} bytes, got {}",
                ESCROW_RECORD_LEN,
                body.len()
            );
        }

        let mut reader = &body[..ESCROW_RECORD_LEN];
        EscrowRecord::deserialize(&mut reader).context("Failed to parse escrow account")
    }

    /// Encodes the record the way the program stores it.
    pub fn encode(&self, kind: ProgramKind) -> Result<Vec<u8>> {
        let body = self.try_to_vec().context("Failed to serialize escrow record")?;
        Ok(match kind {
            ProgramKind::Anchor => {
                let mut data = escrow_account_discriminator().to_vec();
                data.extend_from_slice(&body);
                data
            }
            ProgramKind::Native => body,
        })
    }
}

/// Size the program allocates for an escrow account.
pub fn escrow_account_len(kind: ProgramKind) -> usize {
    match kind {
        ProgramKind::Anchor => DISCRIMINATOR_LEN + ESCROW_RECORD_LEN,
        ProgramKind::Native => ESCROW_RECORD_LEN,
    }
}

/// Anchor account discriminator for `Escrow`.
pub fn escrow_account_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    anchor_discriminator("account", "Escrow")
}

/// First 8 bytes of `sha256("<namespace>:<name>")`.
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> EscrowRecord {
        EscrowRecord {
            is_initialized: true,
            initializer_pubkey: Pubkey::new_from_array([1u8; 32]),
            tmp_token_account_pubkey: Pubkey::new_from_array([2u8; 32]),
            initializer_token_to_receive_account_pubkey: Pubkey::new_from_array([3u8; 32]),
            expected_amount: 500,
        }
    }

    /// Test that the packed record matches the 105 byte layout
    /// Why: The native program allocates exactly this many bytes
    #[test]
    fn test_record_len() {
        let data = sample_record().encode(ProgramKind::Native).unwrap();
        assert_eq!(data.len(), ESCROW_RECORD_LEN);
        assert_eq!(data.len(), 105);
        assert_eq!(&data[97..105], &500u64.to_le_bytes());
    }

    /// Test that Anchor data decodes after the discriminator
    #[test]
    fn test_decode_anchor() {
        let data = sample_record().encode(ProgramKind::Anchor).unwrap();
        assert_eq!(data.len(), escrow_account_len(ProgramKind::Anchor));
        let decoded = EscrowRecord::decode(ProgramKind::Anchor, &data).unwrap();
        assert_eq!(decoded, sample_record());
    }

    /// Test that a wrong discriminator is rejected
    /// Why: Reading an unrelated account as an escrow must fail loudly
    #[test]
    fn test_decode_anchor_rejects_wrong_discriminator() {
        let mut data = sample_record().encode(ProgramKind::Anchor).unwrap();
        data[0] ^= 0xff;
        assert!(EscrowRecord::decode(ProgramKind::Anchor, &data).is_err());
    }

    /// Test that short data is rejected for both flavours
    #[test]
    fn test_decode_short_data() {
        assert!(EscrowRecord::decode(ProgramKind::Native, &[0u8; 104]).is_err());
        assert!(EscrowRecord::decode(ProgramKind::Anchor, &[0u8; 4]).is_err());
    }

    /// Test that an is_initialized byte other than 0 or 1 is rejected
    #[test]
    fn test_decode_rejects_invalid_bool() {
        let mut data = sample_record().encode(ProgramKind::Native).unwrap();
        data[0] = 2;
        assert!(EscrowRecord::decode(ProgramKind::Native, &data).is_err());
    }

    /// Test that over-allocated accounts still decode
    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut data = sample_record().encode(ProgramKind::Native).unwrap();
        data.extend_from_slice(&[9u8; 16]);
        let decoded = EscrowRecord::decode(ProgramKind::Native, &data).unwrap();
        assert_eq!(decoded.expected_amount, 500);
    }

    /// Test that the instruction sighash is the sha256 prefix of the namespaced name
    #[test]
    fn test_anchor_discriminator_is_sha256_prefix() {
        let expected = Sha256::digest(b"global:init_escrow");
        assert_eq!(anchor_discriminator("global", "init_escrow"), expected[..8]);
    }
}
