//! Parameter and result types for cryptographic operations
//!
//! These are the shapes exchanged with callers and with the remote
//! delegation collaborator. Results are tagged with the identifier of the
//! key and the algorithm that produced them.

use crate::algorithm::AlgorithmName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations a key can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    WrapKey,
    UnwrapKey,
}

impl KeyOperation {
    /// Returns the JWK `key_ops` identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOperation::Encrypt => "encrypt",
            KeyOperation::Decrypt => "decrypt",
            KeyOperation::Sign => "sign",
            KeyOperation::Verify => "verify",
            KeyOperation::WrapKey => "wrapKey",
            KeyOperation::UnwrapKey => "unwrapKey",
        }
    }

    /// Returns true if the operation only needs public key material
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            KeyOperation::Encrypt | KeyOperation::Verify | KeyOperation::WrapKey
        )
    }
}

impl fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for an encrypt operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptParameters {
    pub algorithm: AlgorithmName,
    pub plaintext: Vec<u8>,
    /// Initialization vector; generated locally when absent and required
    pub iv: Option<Vec<u8>>,
    pub additional_authenticated_data: Option<Vec<u8>>,
}

impl EncryptParameters {
    pub fn new(algorithm: impl Into<AlgorithmName>, plaintext: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            plaintext: plaintext.into(),
            iv: None,
            additional_authenticated_data: None,
        }
    }

    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = Some(iv.into());
        self
    }

    pub fn with_additional_authenticated_data(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.additional_authenticated_data = Some(aad.into());
        self
    }
}

/// Parameters for a decrypt operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptParameters {
    pub algorithm: AlgorithmName,
    pub ciphertext: Vec<u8>,
    pub iv: Option<Vec<u8>>,
    pub additional_authenticated_data: Option<Vec<u8>>,
    pub authentication_tag: Option<Vec<u8>>,
}

impl DecryptParameters {
    pub fn new(algorithm: impl Into<AlgorithmName>, ciphertext: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ciphertext: ciphertext.into(),
            iv: None,
            additional_authenticated_data: None,
            authentication_tag: None,
        }
    }

    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = Some(iv.into());
        self
    }

    pub fn with_additional_authenticated_data(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.additional_authenticated_data = Some(aad.into());
        self
    }

    pub fn with_authentication_tag(mut self, tag: impl Into<Vec<u8>>) -> Self {
        self.authentication_tag = Some(tag.into());
        self
    }

    /// Builds decrypt parameters that reverse a previous encryption
    pub fn from_encrypt_result(result: &EncryptResult) -> Self {
        Self {
            algorithm: result.algorithm.clone(),
            ciphertext: result.ciphertext.clone(),
            iv: result.iv.clone(),
            additional_authenticated_data: result.additional_authenticated_data.clone(),
            authentication_tag: result.authentication_tag.clone(),
        }
    }
}

/// Result of an encrypt operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub ciphertext: Vec<u8>,
    pub iv: Option<Vec<u8>>,
    pub authentication_tag: Option<Vec<u8>>,
    pub additional_authenticated_data: Option<Vec<u8>>,
}

/// Result of a decrypt operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub plaintext: Vec<u8>,
}

/// Result of a sign operation; ECDSA signatures are raw `R || S`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub signature: Vec<u8>,
}

/// Result of a verify operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub is_valid: bool,
}

impl VerifyResult {
    /// Turns an invalid signature into [`crate::Error::AuthenticationFailure`]
    pub fn ensure_valid(&self) -> crate::Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(crate::Error::AuthenticationFailure {
                algorithm: self.algorithm.to_string(),
            })
        }
    }
}

/// Result of a wrap key operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub encrypted_key: Vec<u8>,
}

/// Result of an unwrap key operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrapResult {
    pub key_id: String,
    pub algorithm: AlgorithmName,
    pub key: Vec<u8>,
}
