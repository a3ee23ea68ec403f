//! Entitlement leaf encoding.

use sha2::{Digest, Sha256};

use craftdrop_core::{Entitlement, Hash, Phase, PublicKey};

/// Length of the leaf pre-image: phase (1) + recipient (32) + amount (8).
pub const LEAF_PREIMAGE_LEN: usize = 1 + 32 + 8;

/// Build the fixed leaf pre-image `phase || recipient || amount.to_le_bytes()`.
pub fn leaf_preimage(phase: Phase, recipient: &PublicKey, amount: u64) -> [u8; LEAF_PREIMAGE_LEN] {
    let mut data = [0u8; LEAF_PREIMAGE_LEN];
    data[0] = phase;
    data[1..33].copy_from_slice(recipient);
    data[33..].copy_from_slice(&amount.to_le_bytes());
    data
}

/// Compute the leaf hash for one recipient's entitlement.
///
/// This formula MUST match the verifier's own leaf derivation, which
/// hashes the identical 41 bytes with a single SHA-256.
pub fn encode_leaf(phase: Phase, recipient: &PublicKey, amount: u64) -> Hash {
    Sha256::digest(leaf_preimage(phase, recipient, amount)).into()
}

/// Leaf hash of an [`Entitlement`]
pub fn entitlement_leaf(entitlement: &Entitlement) -> Hash {
    encode_leaf(entitlement.phase, &entitlement.recipient, entitlement.amount)
}
