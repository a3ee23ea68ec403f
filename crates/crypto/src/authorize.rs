//! Delegated-claim authorization.
//!
//! An entitlement owner pre-signs "this proof may be redeemed by this
//! receiver until this time" so another wallet can submit the claim.
//!
//! Digest: `SHA256( SHA256(proof_bytes) || receiver || expiry_le_i64 )`.
//! What Ed25519 signs depends on [`AuthorizationEncoding`]: the 32 digest
//! bytes, or their 64-character lowercase hex rendering.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use craftdrop_core::{short_hex, AuthorizationEncoding, DistributorConfig, Hash, PublicKey, Signature};

use crate::keys::SigningKeypair;
use crate::sign::{sign_data, verify_signature};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Invalid expiry {expiry}: must be later than now ({now})")]
    InvalidExpiry { expiry: i64, now: i64 },

    #[error("Authorization already expired at creation: expiry {expiry} < now {now}")]
    ExpiredAtCreation { expiry: i64, now: i64 },

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Authorization encoding not confirmed for this deployment")]
    EncodingUnconfirmed,
}

pub type Result<T> = std::result::Result<T, AuthorizationError>;

/// A signed, expiring, receiver-bound delegation of one claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAuthorization {
    /// Entitlement owner (the signer)
    pub owner: PublicKey,
    /// Wallet allowed to submit the claim and receive the funds
    pub receiver: PublicKey,
    /// Absolute UNIX timestamp (seconds)
    pub expiry: i64,
    /// `SHA256(SHA256(proof_bytes) || receiver || expiry)`
    pub digest: Hash,
    pub encoding: AuthorizationEncoding,
    /// Exact bytes passed to Ed25519
    pub message: Vec<u8>,
    pub signature: Signature,
}

/// SHA-256 of the concatenated proof bytes.
pub fn proof_commitment(proof_bytes: &[u8]) -> Hash {
    Sha256::digest(proof_bytes).into()
}

/// Compute the delegated-claim digest.
pub fn authorization_digest(proof_bytes: &[u8], receiver: &PublicKey, expiry: i64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(proof_commitment(proof_bytes));
    hasher.update(receiver);
    hasher.update(expiry.to_le_bytes());
    hasher.finalize().into()
}

/// Bytes Ed25519 signs for a digest under the given encoding.
pub fn authorization_message(digest: &Hash, encoding: AuthorizationEncoding) -> Vec<u8> {
    match encoding {
        AuthorizationEncoding::RawDigest => digest.to_vec(),
        AuthorizationEncoding::HexDigest => hex::encode(digest).into_bytes(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Produces [`ClaimAuthorization`]s under one confirmed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimAuthorizer {
    encoding: AuthorizationEncoding,
}

impl ClaimAuthorizer {
    pub fn new(encoding: AuthorizationEncoding) -> Self {
        Self { encoding }
    }

    /// Build from a deployment config. Refuses until the encoding is pinned.
    pub fn from_config(config: &DistributorConfig) -> Result<Self> {
        config
            .authorization_encoding
            .map(Self::new)
            .ok_or(AuthorizationError::EncodingUnconfirmed)
    }

    pub fn encoding(&self) -> AuthorizationEncoding {
        self.encoding
    }

    /// Sign a delegation against the system clock.
    pub fn authorize(
        &self,
        owner: &SigningKeypair,
        proof_bytes: &[u8],
        receiver: &PublicKey,
        expiry: i64,
    ) -> Result<ClaimAuthorization> {
        self.authorize_at(owner, proof_bytes, receiver, expiry, unix_now())
    }

    /// Sign a delegation, judging `expiry` against the supplied `now`.
    pub fn authorize_at(
        &self,
        owner: &SigningKeypair,
        proof_bytes: &[u8],
        receiver: &PublicKey,
        expiry: i64,
        now: i64,
    ) -> Result<ClaimAuthorization> {
        if expiry < now {
            return Err(AuthorizationError::ExpiredAtCreation { expiry, now });
        }
        if expiry == now || expiry <= 0 {
            return Err(AuthorizationError::InvalidExpiry { expiry, now });
        }

        let digest = authorization_digest(proof_bytes, receiver, expiry);
        let message = authorization_message(&digest, self.encoding);
        let signature = sign_data(owner, &message);

        let owner_pubkey = owner.public_key_bytes();
        if !verify_signature(&owner_pubkey, &message, &signature) {
            return Err(AuthorizationError::SigningFailure(
                "signature does not verify under the owner key".to_string(),
            ));
        }

        info!(
            "Authorized claim: owner {} -> receiver {}, expiry {}, digest {}",
            short_hex(&owner_pubkey),
            short_hex(receiver),
            expiry,
            short_hex(&digest)
        );

        Ok(ClaimAuthorization {
            owner: owner_pubkey,
            receiver: *receiver,
            expiry,
            digest,
            encoding: self.encoding,
            message,
            signature,
        })
    }

    /// Sign a delegation from raw 64-byte keypair material.
    ///
    /// The keypair only lives for this call and is zeroized on return.
    pub fn authorize_with_keypair_bytes(
        &self,
        keypair_bytes: &[u8],
        proof_bytes: &[u8],
        receiver: &PublicKey,
        expiry: i64,
    ) -> Result<ClaimAuthorization> {
        let owner = SigningKeypair::from_keypair_bytes(keypair_bytes)
            .map_err(|e| AuthorizationError::SigningFailure(e.to_string()))?;
        self.authorize(&owner, proof_bytes, receiver, expiry)
    }
}

/// Recompute the digest and message from `proof_bytes` and check the
/// signature against the owner key.
pub fn verify_authorization(auth: &ClaimAuthorization, proof_bytes: &[u8]) -> bool {
    let digest = authorization_digest(proof_bytes, &auth.receiver, auth.expiry);
    if digest != auth.digest {
        return false;
    }
    let message = authorization_message(&digest, auth.encoding);
    message == auth.message && verify_signature(&auth.owner, &message, &auth.signature)
}
