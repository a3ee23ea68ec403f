//! CraftDrop Merkle
//!
//! Leaf encoding and the sorted-pair binary Merkle tree that commits to a
//! whole distribution phase.
//!
//! The same formulas are re-derived independently by the on-chain
//! verifier, so every byte here is protocol:
//!
//! - Leaf: `SHA256(phase || recipient || amount_le)` over a fixed 41-byte pre-image.
//! - Node: `SHA256(min(a, b) || max(a, b))`, so proofs carry no left/right bits.

mod leaf;
mod merkle;

pub use leaf::{encode_leaf, entitlement_leaf, leaf_preimage, LEAF_PREIMAGE_LEN};
pub use merkle::{hash_pair, MerkleProof, MerkleTree};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Empty tree: no leaves to commit to")]
    EmptyTree,

    #[error("Leaf not found in tree")]
    NotFound,

    #[error("Invalid proof length: {0} bytes is not a multiple of 32")]
    InvalidProofLength(usize),
}

pub type Result<T> = std::result::Result<T, MerkleError>;
