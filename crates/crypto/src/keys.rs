use std::path::Path;

use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

use craftdrop_core::PublicKey;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid secret key length: expected 32 bytes, got {0}")]
    InvalidSecretKey(usize),

    #[error("Invalid keypair length: expected 64 bytes, got {0}")]
    InvalidKeypairLength(usize),

    #[error("Keypair public half does not match its secret key")]
    PublicKeyMismatch,

    #[error("Failed to read keypair file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse keypair file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Keypair for signing (Ed25519).
///
/// The secret half is zeroized when the keypair is dropped.
pub struct SigningKeypair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl Clone for SigningKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
            verifying_key: self.verifying_key,
        }
    }
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("public_key", &craftdrop_core::encode_pubkey(&self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

impl SigningKeypair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get the public key as bytes
    pub fn public_key_bytes(&self) -> PublicKey {
        self.verifying_key.to_bytes()
    }

    /// Create from raw secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from a secret key slice of exactly 32 bytes
    pub fn from_secret_slice(secret: &[u8]) -> Result<Self, KeyError> {
        let secret: &[u8; SECRET_KEY_LENGTH] = secret
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey(secret.len()))?;
        Ok(Self::from_secret_bytes(secret))
    }

    /// Create from the 64-byte `secret || public` layout used by wallet
    /// keypair files. The public half must match the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; KEYPAIR_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidKeypairLength(bytes.len()))?;
        let signing_key =
            SigningKey::from_keypair_bytes(bytes).map_err(|_| KeyError::PublicKeyMismatch)?;
        let verifying_key = signing_key.verifying_key();
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Load a wallet keypair file (JSON array of 64 byte values).
    ///
    /// The file contents and parsed bytes live in zeroizing buffers.
    pub fn load_from_file(path: &Path) -> Result<Self, KeyError> {
        let content = Zeroizing::new(std::fs::read_to_string(path)?);
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(serde_json::from_str(&content)?);
        Self::from_keypair_bytes(&bytes)
    }
}
