//! Distributor configuration
//!
//! Seeds, mint and program addresses are injected at every call site
//! through this struct rather than read from module-level constants.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{AuthorizationEncoding, PublicKey};

/// Ed25519 native signature-verification program
/// Program: Ed25519SigVerify111111111111111111111111111
pub const ED25519_PROGRAM_ID: PublicKey = [
    3, 125, 70, 214, 124, 147, 251, 190, 18, 249, 66, 143, 131, 141, 64, 255,
    5, 112, 116, 73, 39, 244, 138, 100, 252, 202, 112, 68, 128, 0, 0, 0,
];

/// SPL Token-2022 program
/// Program: TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb
pub const TOKEN_2022_PROGRAM_ID: PublicKey = [
    6, 221, 246, 225, 238, 117, 143, 222, 24, 66, 93, 188, 228, 108, 205, 218,
    182, 26, 252, 77, 131, 185, 13, 39, 254, 189, 249, 40, 216, 161, 139, 252,
];

/// Legacy SPL Token program
/// Program: TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA
pub const TOKEN_PROGRAM_ID: PublicKey = [
    6, 221, 246, 225, 215, 101, 161, 147, 217, 203, 225, 70, 206, 235, 121, 172,
    28, 180, 133, 237, 95, 91, 55, 145, 58, 140, 245, 133, 126, 255, 0, 169,
];

/// Maximum length of a single PDA seed
pub const MAX_SEED_LEN: usize = 32;

/// Largest decimal count whose scale factor (10^n) fits in a u64
pub const MAX_TOKEN_DECIMALS: u8 = 19;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write config: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for one distributor deployment (program + mint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Verifier program that stores roots and executes claims
    #[serde(with = "base58_key")]
    pub program_id: PublicKey,

    /// Mint of the token being distributed
    #[serde(with = "base58_key")]
    pub mint: PublicKey,

    /// Token program owning `mint`
    #[serde(with = "base58_key", default = "default_token_program")]
    pub token_program_id: PublicKey,

    /// Program that checks the delegated-claim Ed25519 signature
    #[serde(with = "base58_key", default = "default_signature_program")]
    pub signature_program_id: PublicKey,

    /// Seed prefix of the per-phase root account
    #[serde(default = "default_phase_seed")]
    pub phase_seed: String,

    /// Seed prefix of the per-recipient claim record
    #[serde(default = "default_claim_seed")]
    pub claim_seed: String,

    /// Decimal places of the mint (scales entitlement amounts)
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Delegated-claim message encoding accepted by the deployed verifier.
    /// Unset until confirmed; delegated claims are refused while unset.
    #[serde(default)]
    pub authorization_encoding: Option<AuthorizationEncoding>,
}

fn default_token_program() -> PublicKey {
    TOKEN_2022_PROGRAM_ID
}

fn default_signature_program() -> PublicKey {
    ED25519_PROGRAM_ID
}

fn default_phase_seed() -> String {
    "merkle_root".to_string()
}

fn default_claim_seed() -> String {
    "claim_record".to_string()
}

fn default_token_decimals() -> u8 {
    9
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            program_id: [0u8; 32],
            mint: [0u8; 32],
            token_program_id: default_token_program(),
            signature_program_id: default_signature_program(),
            phase_seed: default_phase_seed(),
            claim_seed: default_claim_seed(),
            token_decimals: default_token_decimals(),
            authorization_encoding: None,
        }
    }
}

impl DistributorConfig {
    /// Create a configuration for a program and mint with default seeds
    pub fn new(program_id: PublicKey, mint: PublicKey) -> Self {
        Self {
            program_id,
            mint,
            ..Default::default()
        }
    }

    /// Use the legacy SPL Token program instead of Token-2022
    pub fn with_legacy_token_program(mut self) -> Self {
        self.token_program_id = TOKEN_PROGRAM_ID;
        self
    }

    /// Pin the delegated-claim message encoding
    pub fn with_authorization_encoding(mut self, encoding: AuthorizationEncoding) -> Self {
        self.authorization_encoding = Some(encoding);
        self
    }

    /// Check the fields the derived addresses depend on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program_id == [0u8; 32] {
            return Err(ConfigError::Invalid("program_id is unset".to_string()));
        }
        if self.mint == [0u8; 32] {
            return Err(ConfigError::Invalid("mint is unset".to_string()));
        }
        if self.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "token_decimals must be at most {}, got {}",
                MAX_TOKEN_DECIMALS, self.token_decimals
            )));
        }
        for (name, seed) in [("phase_seed", &self.phase_seed), ("claim_seed", &self.claim_seed)] {
            if seed.is_empty() || seed.len() > MAX_SEED_LEN {
                return Err(ConfigError::Invalid(format!(
                    "{} must be 1..={} bytes, got {}",
                    name,
                    MAX_SEED_LEN,
                    seed.len()
                )));
            }
        }
        Ok(())
    }

    /// Load a configuration file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Self = serde_json::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        info!("Loaded distributor config from {:?}", path);
        Ok(config)
    }

    /// Save the configuration, creating parent directories if needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::ParseError)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        info!("Saved distributor config to {:?}", path);
        Ok(())
    }
}

/// Serde adapter storing keys as base58 address strings
mod base58_key {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::{decode_pubkey, encode_pubkey, PublicKey};

    pub fn serialize<S: Serializer>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_pubkey(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_pubkey(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("craftdrop-config-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = DistributorConfig::default();
        assert_eq!(config.phase_seed, "merkle_root");
        assert_eq!(config.claim_seed, "claim_record");
        assert_eq!(config.token_decimals, 9);
        assert_eq!(config.token_program_id, TOKEN_2022_PROGRAM_ID);
        assert_eq!(config.signature_program_id, ED25519_PROGRAM_ID);
        assert!(config.authorization_encoding.is_none());
    }

    #[test]
    fn test_default_config_is_not_valid() {
        let err = DistributorConfig::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid config: program_id is unset");
    }

    #[test]
    fn test_validate_seed_length() {
        let mut config = DistributorConfig::new([1u8; 32], [2u8; 32]);
        assert!(config.validate().is_ok());

        config.claim_seed = "x".repeat(33);
        assert!(config.validate().is_err());

        config.claim_seed = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_token_decimals() {
        let mut config = DistributorConfig::new([1u8; 32], [2u8; 32]);
        config.token_decimals = MAX_TOKEN_DECIMALS;
        assert!(config.validate().is_ok());
        assert!(10u64.checked_pow(MAX_TOKEN_DECIMALS as u32).is_some());

        config.token_decimals = 20;
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid config: token_decimals must be at most 19, got 20"
        );
    }

    #[test]
    fn test_legacy_token_program() {
        let config = DistributorConfig::new([1u8; 32], [2u8; 32]).with_legacy_token_program();
        assert_eq!(config.token_program_id, TOKEN_PROGRAM_ID);
        assert_ne!(TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID);
    }

    #[test]
    fn test_json_uses_base58_keys() {
        let config = DistributorConfig::new([1u8; 32], [2u8; 32]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["program_id"], "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi");
        assert_eq!(json["signature_program_id"], "Ed25519SigVerify111111111111111111111111111");
        assert_eq!(json["token_program_id"], "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
        assert!(json["authorization_encoding"].is_null());
    }

    #[test]
    fn test_minimal_json_fills_defaults() {
        let json = r#"{
            "program_id": "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi",
            "mint": "8qbHbw2BbbTHBW1sbeqakYXVKRQM8Ne7pLK7m6CVfeR",
            "authorization_encoding": "hex_digest"
        }"#;
        let config: DistributorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.program_id, [1u8; 32]);
        assert_eq!(config.mint, [2u8; 32]);
        assert_eq!(config.phase_seed, "merkle_root");
        assert_eq!(config.authorization_encoding, Some(AuthorizationEncoding::HexDigest));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let config = DistributorConfig::new([1u8; 32], [2u8; 32])
            .with_authorization_encoding(AuthorizationEncoding::RawDigest);

        config.save_to(&path).unwrap();
        let loaded = DistributorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_path("missing");
        let err = DistributorConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
