//! Digest algorithms and the signature-to-digest lookup
//!
//! Signing operates on pre-hashed payloads. [`SignatureHashResolver`] maps a
//! signature algorithm to the digest its payload must be hashed with. There
//! is no fallback: an unmapped algorithm is an error.

use crate::algorithm::AlgorithmName;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::collections::HashMap;
use std::fmt;

/// A SHA-2 digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Digest output length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Hash `data` in one shot
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static SIGNATURE_DIGESTS: Lazy<HashMap<AlgorithmName, DigestAlgorithm>> = Lazy::new(|| {
    use DigestAlgorithm::*;
    [
        (AlgorithmName::RS256, Sha256),
        (AlgorithmName::RS384, Sha384),
        (AlgorithmName::RS512, Sha512),
        (AlgorithmName::PS256, Sha256),
        (AlgorithmName::PS384, Sha384),
        (AlgorithmName::PS512, Sha512),
        (AlgorithmName::ES256, Sha256),
        (AlgorithmName::ES256K, Sha256),
        (AlgorithmName::ES384, Sha384),
        (AlgorithmName::ES512, Sha512),
    ]
    .into_iter()
    .collect()
});

/// Resolves the digest a signature algorithm signs over
pub struct SignatureHashResolver;

impl SignatureHashResolver {
    /// Look up the digest for `algorithm`
    ///
    /// Fails with [`Error::UnsupportedAlgorithm`] for names with no mapping.
    pub fn resolve(algorithm: &str) -> Result<DigestAlgorithm> {
        let name = AlgorithmName::from(algorithm);
        SIGNATURE_DIGESTS
            .get(&name)
            .copied()
            .ok_or_else(|| Error::UnsupportedAlgorithm {
                algorithm: name.to_string(),
            })
    }

    /// Hash `data` with the digest mapped to `algorithm`
    pub fn hash_for(algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::resolve(algorithm)?.digest(data))
    }
}
