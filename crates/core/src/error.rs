use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_public_key() {
        let err = CoreError::InvalidPublicKey("abc".to_string());
        assert_eq!(err.to_string(), "Invalid public key: abc");
    }

    #[test]
    fn test_error_display_invalid_hash() {
        let err = CoreError::InvalidHash("too short".to_string());
        assert_eq!(err.to_string(), "Invalid hash: too short");
    }
}
