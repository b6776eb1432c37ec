//! RSA encryption descriptors: RSA1_5, RSA-OAEP and RSA-OAEP-256

use super::AlgorithmName;
use crate::error::{Error, Result};
use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

/// Padding scheme of an RSA encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaEncryptionPadding {
    /// RSAES-PKCS1-v1_5
    Pkcs1v15,
    /// RSAES-OAEP with SHA-1 and MGF1-SHA-1
    OaepSha1,
    /// RSAES-OAEP with SHA-256 and MGF1-SHA-256
    OaepSha256,
}

/// RSA encryption descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaEncryption {
    name: AlgorithmName,
    padding: RsaEncryptionPadding,
}

impl RsaEncryption {
    pub const fn new(name: AlgorithmName, padding: RsaEncryptionPadding) -> Self {
        Self { name, padding }
    }

    pub fn name(&self) -> &AlgorithmName {
        &self.name
    }

    pub fn padding(&self) -> RsaEncryptionPadding {
        self.padding
    }

    /// Encrypt `plaintext` with the public key
    pub fn encrypt(&self, key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut rng = OsRng;
        let result = match self.padding {
            RsaEncryptionPadding::Pkcs1v15 => key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
            RsaEncryptionPadding::OaepSha1 => key.encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext),
            RsaEncryptionPadding::OaepSha256 => {
                key.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext)
            }
        };
        result.map_err(|e| match e {
            rsa::Error::MessageTooLong => Error::InvalidParameter {
                algorithm: self.name.to_string(),
                reason: format!("plaintext of {} bytes is too long for the key", plaintext.len()),
            },
            other => Error::Cryptography(format!("{}: encryption failed: {}", self.name, other)),
        })
    }

    /// Decrypt `ciphertext` with the private key
    pub fn decrypt(&self, key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let result = match self.padding {
            RsaEncryptionPadding::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, ciphertext),
            RsaEncryptionPadding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), ciphertext),
            RsaEncryptionPadding::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), ciphertext),
        };
        result.map_err(|_| Error::Cryptography(format!("{}: decryption failed", self.name)))
    }
}
