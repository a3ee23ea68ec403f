//! CraftDrop Settlement
//!
//! Packs distribution entries and claim authorizations into the exact
//! instructions the on-chain airdrop verifier expects, derives the
//! program addresses involved, and reads the verifier's current root.
//!
//! ## Claim Flow
//!
//! 1. **Publish**: the admin posts the phase root with `init_merkle_root`
//!    (later `update_merkle_root`), which also creates the token vault.
//! 2. **Direct claim**: the entitled wallet signs `claim_airdrop` with its
//!    amount and proof; funds go to any receiver's token account.
//! 3. **Delegated claim**: the owner pre-signs an expiring authorization;
//!    the receiver submits `claim_airdrop_with_receiver` preceded by an
//!    Ed25519 verify instruction and is paid into its own token account.
//! 4. **Sweep**: after the campaign the admin withdraws what is left.
//!
//! Each (phase, owner, mint) may claim once; the verifier enforces this
//! with a claim record account seeded by those three values.

mod assembler;
mod pda;
mod root;
mod types;

pub use assembler::{ed25519_verify_instruction_data, ClaimAssembler};
pub use pda::*;
pub use root::{check_snapshot, MockRootFetcher, RootFetcher, RpcRootFetcher};
pub use types::*;

use thiserror::Error;

use craftdrop_core::{AuthorizationEncoding, ConfigError};
use craftdrop_crypto::AuthorizationError;
use craftdrop_distribution::DistributionError;

/// Errors reading the verifier's root account
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Root for phase {0} is not initialized")]
    NotInitialized(u8),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
}

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Invalid amount: claims must be greater than zero")]
    InvalidAmount,

    #[error("Authorization receiver does not match the submitting wallet")]
    ReceiverMismatch,

    #[error("Authorization owner does not match the entitlement owner")]
    OwnerMismatch,

    #[error("Authorization does not commit to this entitlement's proof")]
    ProofMismatch,

    #[error("Authorization signature does not verify")]
    InvalidSignature,

    #[error("Authorization signed as {signed:?}, deployment expects {pinned:?}")]
    EncodingMismatch {
        pinned: AuthorizationEncoding,
        signed: AuthorizationEncoding,
    },

    #[error("Signature verify instruction index {0} does not fit in a u8")]
    InstructionIndexOverflow(usize),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
