//! The public cryptography client
//!
//! [`CryptographyClient`] asks the local provider first. When the provider
//! delegates, the operation goes to the remote client if one is attached,
//! otherwise the delegation reason becomes the error.

use super::{create_provider, DelegateReason, LocalCryptographyProvider, LocalOutcome};
use crate::algorithm::AlgorithmName;
use crate::config::{self, CryptographyClientOptions};
use crate::error::{Error, Result};
use crate::hash::SignatureHashResolver;
use crate::key::JsonWebKey;
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};
use crate::remote::RemoteCryptographyClient;
use std::sync::Arc;
use tracing::debug;

/// Performs cryptographic operations with one key
#[derive(Debug)]
pub struct CryptographyClient {
    key_id: String,
    local: Option<Box<dyn LocalCryptographyProvider>>,
    remote: Option<Arc<dyn RemoteCryptographyClient>>,
}

impl CryptographyClient {
    /// Create a client for `key`, delegating to `remote` when needed
    pub fn new(
        key: JsonWebKey,
        remote: Option<Arc<dyn RemoteCryptographyClient>>,
        options: CryptographyClientOptions,
    ) -> Result<Self> {
        config::validate(&options, remote.is_some())?;
        let key_id = key.key_id().to_string();
        let local = create_provider(key, options)?;
        debug!(
            key_id = %key_id,
            key_type = %local.key_type(),
            remote = remote.is_some(),
            "created cryptography client"
        );
        Ok(Self {
            key_id,
            local: Some(local),
            remote,
        })
    }

    /// Create a client that only runs locally
    pub fn from_key(key: JsonWebKey) -> Result<Self> {
        Self::new(key, None, CryptographyClientOptions::default())
    }

    /// Create a client with no local key material
    pub fn remote_only(
        key_id: impl Into<String>,
        remote: Arc<dyn RemoteCryptographyClient>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            local: None,
            remote: Some(remote),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The local key, when the client has one
    pub fn key(&self) -> Option<&JsonWebKey> {
        self.local.as_ref().map(|local| local.key())
    }

    pub async fn encrypt(&self, parameters: EncryptParameters) -> Result<EncryptResult> {
        let algorithm = parameters.algorithm.clone();
        let outcome = self.try_local(|local| local.encrypt(&parameters))?;
        match outcome {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::Encrypt, &algorithm, reason)?;
                remote.encrypt(parameters).await
            }
        }
    }

    pub async fn decrypt(&self, parameters: DecryptParameters) -> Result<DecryptResult> {
        let algorithm = parameters.algorithm.clone();
        let outcome = self.try_local(|local| local.decrypt(&parameters))?;
        match outcome {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::Decrypt, &algorithm, reason)?;
                remote.decrypt(parameters).await
            }
        }
    }

    /// Sign a digest computed with the algorithm's hash
    pub async fn sign(
        &self,
        algorithm: impl Into<AlgorithmName>,
        digest: &[u8],
    ) -> Result<SignResult> {
        let algorithm = algorithm.into();
        match self.try_local(|local| local.sign(&algorithm, digest))? {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::Sign, &algorithm, reason)?;
                remote.sign(&algorithm, digest).await
            }
        }
    }

    /// Verify a signature over a digest
    ///
    /// An invalid signature is reported through
    /// [`VerifyResult::is_valid`]; use [`VerifyResult::ensure_valid`] to turn
    /// it into an error.
    pub async fn verify(
        &self,
        algorithm: impl Into<AlgorithmName>,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<VerifyResult> {
        let algorithm = algorithm.into();
        match self.try_local(|local| local.verify(&algorithm, digest, signature))? {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::Verify, &algorithm, reason)?;
                remote.verify(&algorithm, digest, signature).await
            }
        }
    }

    pub async fn wrap_key(
        &self,
        algorithm: impl Into<AlgorithmName>,
        key: &[u8],
    ) -> Result<WrapResult> {
        let algorithm = algorithm.into();
        match self.try_local(|local| local.wrap_key(&algorithm, key))? {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::WrapKey, &algorithm, reason)?;
                remote.wrap_key(&algorithm, key).await
            }
        }
    }

    pub async fn unwrap_key(
        &self,
        algorithm: impl Into<AlgorithmName>,
        encrypted_key: &[u8],
    ) -> Result<UnwrapResult> {
        let algorithm = algorithm.into();
        match self.try_local(|local| local.unwrap_key(&algorithm, encrypted_key))? {
            LocalOutcome::Completed(result) => Ok(result),
            LocalOutcome::Delegate(reason) => {
                let remote = self.remote_for(KeyOperation::UnwrapKey, &algorithm, reason)?;
                remote.unwrap_key(&algorithm, encrypted_key).await
            }
        }
    }

    /// Hash `data` with the algorithm's digest and sign the result
    pub async fn sign_data(
        &self,
        algorithm: impl Into<AlgorithmName>,
        data: &[u8],
    ) -> Result<SignResult> {
        let algorithm = algorithm.into();
        let digest = SignatureHashResolver::hash_for(algorithm.as_str(), data)?;
        self.sign(algorithm, &digest).await
    }

    /// Hash `data` with the algorithm's digest and verify the signature
    pub async fn verify_data(
        &self,
        algorithm: impl Into<AlgorithmName>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<VerifyResult> {
        let algorithm = algorithm.into();
        let digest = SignatureHashResolver::hash_for(algorithm.as_str(), data)?;
        self.verify(algorithm, &digest, signature).await
    }

    fn try_local<T>(
        &self,
        operation: impl FnOnce(&dyn LocalCryptographyProvider) -> Result<LocalOutcome<T>>,
    ) -> Result<LocalOutcome<T>> {
        match &self.local {
            Some(local) => operation(local.as_ref()),
            None => Ok(LocalOutcome::Delegate(DelegateReason::KeyMaterialUnavailable)),
        }
    }

    fn remote_for(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        reason: DelegateReason,
    ) -> Result<&dyn RemoteCryptographyClient> {
        match (&self.remote, &self.local) {
            (Some(remote), _) => {
                debug!(
                    key_id = %self.key_id,
                    algorithm = %algorithm,
                    operation = %operation,
                    reason = %reason,
                    "delegating to remote"
                );
                Ok(remote.as_ref())
            }
            (None, Some(local)) => Err(reason.into_error(operation, algorithm, local.key_type())),
            (None, None) => Err(Error::MissingConfig(
                "no local key and no remote cryptography client".to_string(),
            )),
        }
    }
}
