//! CraftDrop Distribution
//!
//! Turns a raw entitlement list into a per-phase distribution snapshot:
//! merged amounts, one leaf per recipient, the Merkle root, and every
//! recipient's proof. The snapshot is written once and then only read.

mod snapshot;
mod source;

pub use snapshot::{DistributionSnapshot, SnapshotEntry};
pub use source::{
    load_entitlements, merge_entitlements, parse_amount, parse_entitlements, EntitlementSource,
    SkipReason, SkippedRow,
};

use craftdrop_merkle::MerkleError;

/// Distribution errors
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("Recipient not found in distribution: {0}")]
    NotFound(String),

    #[error("Distribution has no entitlements")]
    EmptyDistribution,

    #[error("Amount overflow while merging entitlements for {0}")]
    AmountOverflow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    #[error("Inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),
}

pub type Result<T> = std::result::Result<T, DistributionError>;
