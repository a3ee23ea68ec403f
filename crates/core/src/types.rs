use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// 32-byte Ed25519 public key (a Solana address)
pub type PublicKey = [u8; 32];

/// 32-byte SHA-256 digest
pub type Hash = [u8; 32];

/// 64-byte Ed25519 signature
pub type Signature = [u8; 64];

/// Distribution round identifier.
///
/// Part of every leaf and every derived address, so a proof issued for one
/// phase can never be redeemed against another.
pub type Phase = u8;

/// One recipient's entitlement for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entitlement {
    pub phase: Phase,
    pub recipient: PublicKey,
    /// Base-unit token quantity
    pub amount: u64,
}

impl Entitlement {
    pub fn new(phase: Phase, recipient: PublicKey, amount: u64) -> Self {
        Self { phase, recipient, amount }
    }
}

/// How the delegated-claim digest is presented to Ed25519.
///
/// The two claim paths historically disagree: one signs the 32-byte digest
/// directly, the other signs the 64-character lowercase hex rendering of
/// it. Which one the deployed verifier accepts has to be confirmed per
/// deployment, so the choice is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationEncoding {
    /// Sign the raw 32-byte digest
    RawDigest,
    /// Sign the ASCII hex encoding of the digest (64 bytes)
    HexDigest,
}

/// Encode a public key as a base58 address string
pub fn encode_pubkey(key: &PublicKey) -> String {
    bs58::encode(key).into_string()
}

/// Decode a base58 address string into a public key
pub fn decode_pubkey(s: &str) -> Result<PublicKey> {
    let bytes = bs58::decode(s.trim())
        .into_vec()
        .map_err(|e| CoreError::InvalidPublicKey(format!("{}: {}", s, e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| CoreError::InvalidPublicKey(format!("{}: {} bytes", s, b.len())))
}

/// Encode a hash as a 64-character lowercase hex string
pub fn encode_hash(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Decode a 64-character hex string (optional `0x` prefix) into a hash
pub fn decode_hash(s: &str) -> Result<Hash> {
    let cleaned = s.trim();
    let cleaned = cleaned.strip_prefix("0x").unwrap_or(cleaned);
    if cleaned.len() != 64 {
        return Err(CoreError::InvalidHash(format!(
            "expected 64 hex chars, got {}",
            cleaned.len()
        )));
    }
    let mut hash = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut hash)
        .map_err(|e| CoreError::InvalidHash(e.to_string()))?;
    Ok(hash)
}

/// Short hex prefix (first 8 bytes) for log lines
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}
