//! Error handling for the cryptography engine
//!
//! This module provides the error type shared by the local engine, the
//! dispatch clients and the remote delegation boundary.

use crate::key::KeyType;
use crate::models::KeyOperation;
use thiserror::Error;

/// Type alias for Results with cryptography engine errors
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cryptography engine
#[derive(Error, Debug)]
pub enum Error {
    /// The algorithm does not resolve locally and nothing can delegate it
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// The key kind can never perform this operation
    #[error("Operation {operation} is not supported for key type {key_type}")]
    UnsupportedOperation {
        operation: KeyOperation,
        key_type: KeyType,
    },

    /// Key material has the wrong length, is missing, or lacks a capability
    #[error("Invalid key material for {algorithm}: {reason}")]
    InvalidKeyMaterial { algorithm: String, reason: String },

    /// Malformed IV, missing AAD or tag, wrong digest length
    #[error("Invalid parameter for {algorithm}: {reason}")]
    InvalidParameter { algorithm: String, reason: String },

    /// Authentication tag or integrity check mismatch
    #[error("Authentication failed for {algorithm}")]
    AuthenticationFailure { algorithm: String },

    /// DER signature does not follow the expected structure
    #[error("Malformed signature encoding: {0}")]
    MalformedSignature(String),

    /// The key is disabled or outside its validity window
    #[error("Key {key_id} is not valid at this time")]
    KeyNotValid { key_id: String },

    /// A primitive reported a failure outside the categories above
    #[error("Cryptography error: {0}")]
    Cryptography(String),

    /// The remote key service reported an error
    #[error("Remote error: {0}")]
    Remote(String),

    /// Error when failed to acquire registry read lock
    #[error("Failed to acquire algorithm registry read lock")]
    FailedToAcquireRegistryReadLock,

    /// Error when failed to acquire registry write lock
    #[error("Failed to acquire algorithm registry write lock")]
    FailedToAcquireRegistryWriteLock,

    /// Error related to missing configuration
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Serde JSON error
    #[error("Serde JSON error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// Builds an [`Error::InvalidKeyMaterial`] naming the minimum bit length
    pub(crate) fn key_too_short(algorithm: &str, required_bits: usize, actual_bits: usize) -> Self {
        Error::InvalidKeyMaterial {
            algorithm: algorithm.to_string(),
            reason: format!(
                "key must be at least {} bits, got {} bits",
                required_bits, actual_bits
            ),
        }
    }

    /// Builds an [`Error::InvalidParameter`] for a fixed-size parameter
    pub(crate) fn wrong_length(
        algorithm: &str,
        parameter: &str,
        expected_bits: usize,
        actual_bits: usize,
    ) -> Self {
        Error::InvalidParameter {
            algorithm: algorithm.to_string(),
            reason: format!(
                "{} must be {} bits, got {} bits",
                parameter, expected_bits, actual_bits
            ),
        }
    }

    /// Returns true if the error was detected before any primitive ran
    pub fn is_precondition_failure(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedAlgorithm { .. }
                | Error::UnsupportedOperation { .. }
                | Error::InvalidKeyMaterial { .. }
                | Error::InvalidParameter { .. }
                | Error::KeyNotValid { .. }
        )
    }

    /// Returns true if this error came from the remote key service
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Error::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_too_short_names_algorithm_and_bits() {
        let err = Error::key_too_short("A256CBC-HS512", 512, 256);
        let msg = err.to_string();
        assert!(msg.contains("A256CBC-HS512"));
        assert!(msg.contains("512"));
        assert!(msg.contains("256"));
        assert!(err.is_precondition_failure());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::AuthenticationFailure {
            algorithm: "A128CBC-HS256".to_string(),
        };
        assert!(!err.is_precondition_failure());
        assert!(!err.is_remote_error());

        let err = Error::Remote("service unavailable".to_string());
        assert!(err.is_remote_error());
    }

    #[test]
    fn test_unsupported_operation_display() {
        let err = Error::UnsupportedOperation {
            operation: KeyOperation::Sign,
            key_type: KeyType::Oct,
        };
        assert_eq!(
            err.to_string(),
            "Operation sign is not supported for key type oct"
        );
    }
}
