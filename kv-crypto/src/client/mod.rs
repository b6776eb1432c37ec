//! Key-type dispatch clients
//!
//! Each key kind has a local provider that decides, operation by operation,
//! whether it can run the operation itself. The decision is a value:
//! [`LocalOutcome::Completed`] carries the result, [`LocalOutcome::Delegate`]
//! names why the operation has to go to the remote service. The
//! [`CryptographyClient`] facade acts on that value.
//!
//! Providers check their preconditions in a fixed order:
//!
//! 1. `force_remote` delegates everything
//! 2. the algorithm must resolve with the capability the operation needs
//! 3. the key's `key_ops`, when present, must permit the operation
//! 4. encrypt and wrap fail with [`Error::KeyNotValid`] outside the key's
//!    validity window; this is never delegated
//! 5. the key material the operation needs must be present

use crate::algorithm::{AlgorithmDescriptor, AlgorithmName, AlgorithmRegistry, Capability};
use crate::config::CryptographyClientOptions;
use crate::error::{Error, Result};
use crate::key::{JsonWebKey, KeyType};
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};
use chrono::Utc;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::debug;

/// Unwraps a [`LocalOutcome::Completed`] or returns the delegation
macro_rules! try_local {
    ($outcome:expr) => {
        match $outcome {
            $crate::client::LocalOutcome::Completed(value) => value,
            $crate::client::LocalOutcome::Delegate(reason) => {
                return Ok($crate::client::LocalOutcome::Delegate(reason))
            }
        }
    };
}

mod cryptography_client;
mod ec;
mod rsa;
mod symmetric;

pub use self::cryptography_client::CryptographyClient;
pub use self::ec::EcCryptographyProvider;
pub use self::rsa::RsaCryptographyProvider;
pub use self::symmetric::SymmetricCryptographyProvider;

/// Why an operation cannot run locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateReason {
    /// The algorithm is unknown or belongs to another family
    AlgorithmNotResolved,
    /// The key material the operation needs is not held locally
    KeyMaterialUnavailable,
    /// The key's `key_ops` do not list the operation
    OperationNotPermitted,
    /// The key kind has no local implementation of the operation
    OperationNotSupportedLocally,
    /// Local execution is disabled by the options
    ForcedRemote,
}

impl DelegateReason {
    /// The error reported when there is nothing to delegate to
    pub fn into_error(
        self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        key_type: KeyType,
    ) -> Error {
        match self {
            DelegateReason::AlgorithmNotResolved => Error::UnsupportedAlgorithm {
                algorithm: algorithm.to_string(),
            },
            DelegateReason::KeyMaterialUnavailable => Error::InvalidKeyMaterial {
                algorithm: algorithm.to_string(),
                reason: format!("key material for {} is not available locally", operation),
            },
            DelegateReason::OperationNotPermitted
            | DelegateReason::OperationNotSupportedLocally => {
                Error::UnsupportedOperation { operation, key_type }
            }
            DelegateReason::ForcedRemote => Error::MissingConfig(
                "force_remote is set but no remote cryptography client is configured".to_string(),
            ),
        }
    }
}

impl fmt::Display for DelegateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DelegateReason::AlgorithmNotResolved => "algorithm not resolved",
            DelegateReason::KeyMaterialUnavailable => "key material unavailable",
            DelegateReason::OperationNotPermitted => "operation not permitted",
            DelegateReason::OperationNotSupportedLocally => "operation not supported locally",
            DelegateReason::ForcedRemote => "forced remote",
        };
        f.write_str(reason)
    }
}

/// Result of attempting an operation locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome<T> {
    Completed(T),
    Delegate(DelegateReason),
}

impl<T> LocalOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, LocalOutcome::Completed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LocalOutcome<U> {
        match self {
            LocalOutcome::Completed(value) => LocalOutcome::Completed(f(value)),
            LocalOutcome::Delegate(reason) => LocalOutcome::Delegate(reason),
        }
    }
}

/// Local execution of operations with one key
///
/// Errors are returned for failures that delegation cannot fix, such as a
/// tag mismatch or a malformed parameter.
pub trait LocalCryptographyProvider: Debug + Send + Sync {
    /// The key this provider operates with
    fn key(&self) -> &JsonWebKey;

    /// Key type used in error reports
    fn key_type(&self) -> KeyType;

    fn encrypt(&self, parameters: &EncryptParameters) -> Result<LocalOutcome<EncryptResult>>;

    fn decrypt(&self, parameters: &DecryptParameters) -> Result<LocalOutcome<DecryptResult>>;

    fn sign(&self, algorithm: &AlgorithmName, digest: &[u8]) -> Result<LocalOutcome<SignResult>>;

    fn verify(
        &self,
        algorithm: &AlgorithmName,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<LocalOutcome<VerifyResult>>;

    fn wrap_key(&self, algorithm: &AlgorithmName, key: &[u8]) -> Result<LocalOutcome<WrapResult>>;

    fn unwrap_key(
        &self,
        algorithm: &AlgorithmName,
        encrypted_key: &[u8],
    ) -> Result<LocalOutcome<UnwrapResult>>;
}

/// Create the provider matching the key's `kty`
pub fn create_provider(
    key: JsonWebKey,
    options: CryptographyClientOptions,
) -> Result<Box<dyn LocalCryptographyProvider>> {
    let kty = key
        .kty
        .ok_or_else(|| Error::MissingConfig("key has no key type".to_string()))?;
    let provider: Box<dyn LocalCryptographyProvider> = match kty {
        KeyType::Ec | KeyType::EcHsm => Box::new(EcCryptographyProvider::new(key, options)),
        KeyType::Rsa | KeyType::RsaHsm => Box::new(RsaCryptographyProvider::new(key, options)),
        KeyType::Oct | KeyType::OctHsm => {
            Box::new(SymmetricCryptographyProvider::new(key, options))
        }
    };
    Ok(provider)
}

/// Key, options and registry shared by every provider
#[derive(Debug)]
pub(crate) struct KeyContext {
    pub(crate) key: JsonWebKey,
    pub(crate) options: CryptographyClientOptions,
    registry: Arc<AlgorithmRegistry>,
}

impl KeyContext {
    pub(crate) fn new(key: JsonWebKey, options: CryptographyClientOptions) -> Self {
        let registry = options.registry();
        Self {
            key,
            options,
            registry,
        }
    }

    pub(crate) fn key_id(&self) -> &str {
        self.key.key_id()
    }

    /// Runs the precondition checks and resolves the algorithm
    ///
    /// `has_material` tells whether the key holds what the operation needs.
    pub(crate) fn prepare(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        capability: Capability,
        has_material: bool,
    ) -> Result<LocalOutcome<AlgorithmDescriptor>> {
        if self.options.force_remote {
            return Ok(self.delegate(operation, algorithm, DelegateReason::ForcedRemote));
        }

        let descriptor = match self.registry.resolve_for(algorithm.as_str(), capability) {
            Some(descriptor) => descriptor,
            None => {
                return Ok(self.delegate(
                    operation,
                    algorithm,
                    DelegateReason::AlgorithmNotResolved,
                ))
            }
        };

        if !self.key.supports_operation(operation) {
            return Ok(self.delegate(operation, algorithm, DelegateReason::OperationNotPermitted));
        }

        if matches!(operation, KeyOperation::Encrypt | KeyOperation::WrapKey)
            && !self.key.is_valid_at(Utc::now())
        {
            return Err(Error::KeyNotValid {
                key_id: self.key_id().to_string(),
            });
        }

        if !has_material {
            return Ok(self.delegate(
                operation,
                algorithm,
                DelegateReason::KeyMaterialUnavailable,
            ));
        }

        debug!(
            key_id = self.key_id(),
            algorithm = %descriptor.name(),
            operation = %operation,
            "executing locally"
        );
        Ok(LocalOutcome::Completed(descriptor))
    }

    pub(crate) fn delegate<T>(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        reason: DelegateReason,
    ) -> LocalOutcome<T> {
        debug!(
            key_id = self.key_id(),
            algorithm = %algorithm,
            operation = %operation,
            reason = %reason,
            "cannot execute locally"
        );
        LocalOutcome::Delegate(reason)
    }
}
