//! Remote delegation boundary
//!
//! When an operation cannot run locally the client hands it to a
//! [`RemoteCryptographyClient`], normally a key management service that
//! holds the private half of the key. The collaborator is bound to one key;
//! algorithm names and payloads are passed through unchanged and its results
//! are returned to the caller as they are.

use crate::algorithm::AlgorithmName;
use crate::error::Result;
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, SignResult, UnwrapResult,
    VerifyResult, WrapResult,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// A remote service able to perform operations with a key
///
/// Timeouts and retries belong to implementations of this trait.
#[async_trait]
pub trait RemoteCryptographyClient: Debug + Send + Sync {
    async fn encrypt(&self, parameters: EncryptParameters) -> Result<EncryptResult>;

    async fn decrypt(&self, parameters: DecryptParameters) -> Result<DecryptResult>;

    /// Sign a pre-computed digest
    async fn sign(&self, algorithm: &AlgorithmName, digest: &[u8]) -> Result<SignResult>;

    async fn verify(
        &self,
        algorithm: &AlgorithmName,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<VerifyResult>;

    async fn wrap_key(&self, algorithm: &AlgorithmName, key: &[u8]) -> Result<WrapResult>;

    async fn unwrap_key(
        &self,
        algorithm: &AlgorithmName,
        encrypted_key: &[u8],
    ) -> Result<UnwrapResult>;
}
