//! Settlement types for on-chain operations

use craftdrop_core::{Hash, Phase, PublicKey, Signature};

use crate::FetchError;

/// Anchor account discriminator of the verifier's root account:
/// first 8 bytes of SHA256("account:MerkleRoot")
pub const ROOT_ACCOUNT_DISCRIMINATOR: [u8; 8] = [0x1e, 0xf0, 0x5e, 0x91, 0x4a, 0x3b, 0x8a, 0xb9];

/// Root account size: discriminator + bump + admin + phase + root + paused + padding
pub const ROOT_ACCOUNT_LEN: usize = 8 + 1 + 32 + 1 + 32 + 1 + 32;

/// Bytes needed to decode every field before the trailing padding
const ROOT_ACCOUNT_MIN_LEN: usize = ROOT_ACCOUNT_LEN - 32;

/// Decoded root account for one (phase, mint)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootInfo {
    pub bump: u8,
    /// Only this key may update the root, pause, or withdraw
    pub admin: PublicKey,
    pub phase: Phase,
    pub merkle_root: Hash,
    /// Claims are rejected while paused
    pub paused: bool,
}

impl RootInfo {
    /// Decode from raw account data.
    ///
    /// Layout (after 8-byte discriminator):
    ///   0..1:   bump u8
    ///   1..33:  admin [u8; 32]
    ///  33..34:  phase u8
    ///  34..66:  merkle_root [u8; 32]
    ///  66..67:  paused bool
    ///  67..99:  padding
    pub fn from_account_data(data: &[u8]) -> Result<Self, FetchError> {
        if data.len() < ROOT_ACCOUNT_MIN_LEN {
            return Err(FetchError::InvalidAccountData(format!(
                "root account too short: {} bytes",
                data.len()
            )));
        }
        if data[..8] != ROOT_ACCOUNT_DISCRIMINATOR {
            return Err(FetchError::InvalidAccountData(
                "not a merkle root account".to_string(),
            ));
        }
        let d = &data[8..];

        let mut admin = [0u8; 32];
        admin.copy_from_slice(&d[1..33]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&d[34..66]);
        let paused = match d[66] {
            0 => false,
            1 => true,
            other => {
                return Err(FetchError::InvalidAccountData(format!(
                    "invalid paused flag {}",
                    other
                )))
            }
        };

        Ok(Self {
            bump: d[0],
            admin,
            phase: d[33],
            merkle_root,
            paused,
        })
    }

    /// Encode in the on-chain layout (zero padding)
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(ROOT_ACCOUNT_LEN);
        data.extend_from_slice(&ROOT_ACCOUNT_DISCRIMINATOR);
        data.push(self.bump);
        data.extend_from_slice(&self.admin);
        data.push(self.phase);
        data.extend_from_slice(&self.merkle_root);
        data.push(self.paused as u8);
        data.extend_from_slice(&[0u8; 32]);
        data
    }
}

/// Local snapshot compared against the verifier's current root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStatus {
    /// On-chain root matches the snapshot and claims are open
    Current,
    /// On-chain root differs; proofs from the snapshot will be rejected
    Stale { on_chain: Hash },
    /// Root matches but the verifier has paused claims
    Paused,
}

/// `claim_airdrop` arguments (signer is the entitlement owner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectClaim {
    pub phase: Phase,
    pub amount: u64,
    /// Concatenated 32-byte sibling hashes
    pub proof: Vec<u8>,
}

/// `claim_airdrop_with_receiver` arguments (signer is the receiver)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedClaim {
    pub phase: Phase,
    pub proof_owner: PublicKey,
    pub amount: u64,
    pub proof: Vec<u8>,
    pub expire_at: i64,
    pub signature: Signature,
    /// Position of the Ed25519 verify instruction in the transaction
    pub verify_ix_index: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn sample() -> RootInfo {
        RootInfo {
            bump: 254,
            admin: [5u8; 32],
            phase: 1,
            merkle_root: [0xAAu8; 32],
            paused: false,
        }
    }

    #[test]
    fn test_discriminator_matches_anchor_rule() {
        let digest = Sha256::digest(b"account:MerkleRoot");
        assert_eq!(&digest[..8], &ROOT_ACCOUNT_DISCRIMINATOR);
    }

    #[test]
    fn test_root_account_layout() {
        let data = sample().to_account_data();
        assert_eq!(data.len(), ROOT_ACCOUNT_LEN);
        assert_eq!(data.len(), 107);
        assert_eq!(data[8], 254);
        assert_eq!(&data[9..41], &[5u8; 32]);
        assert_eq!(data[41], 1);
        assert_eq!(&data[42..74], &[0xAAu8; 32]);
        assert_eq!(data[74], 0);
    }

    #[test]
    fn test_decode_root_account() {
        let mut info = sample();
        info.paused = true;
        let decoded = RootInfo::from_account_data(&info.to_account_data()).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_decode_rejects_bad_data() {
        let data = sample().to_account_data();

        assert!(RootInfo::from_account_data(&data[..50]).is_err());

        let mut wrong_disc = data.clone();
        wrong_disc[0] ^= 0xFF;
        assert!(RootInfo::from_account_data(&wrong_disc).is_err());

        let mut bad_flag = data;
        bad_flag[74] = 2;
        assert!(matches!(
            RootInfo::from_account_data(&bad_flag).unwrap_err(),
            FetchError::InvalidAccountData(_)
        ));
    }
}
