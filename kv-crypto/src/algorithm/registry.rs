//! Name to descriptor registry
//!
//! A registry is seeded with the built-in algorithms and may be changed at
//! runtime. Lookups take a read lock, registration takes a write lock.
//! Clients hold an `Arc<AlgorithmRegistry>`; [`AlgorithmRegistry::shared`]
//! returns the process-wide instance used when none is injected.

use super::{
    AesCbc, AesGcm, AesKw, AlgorithmDescriptor, AlgorithmName, Capability, EcdsaAlgorithm,
    RsaEncryption, RsaSignatureAlgorithm, SignatureAlgorithm, SymmetricAlgorithm,
};
use crate::crypto::AesCbcHmacSha2;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

static SHARED_REGISTRY: Lazy<Arc<AlgorithmRegistry>> =
    Lazy::new(|| Arc::new(AlgorithmRegistry::with_defaults()));

/// Registry of algorithm descriptors keyed by normalized name
#[derive(Debug)]
pub struct AlgorithmRegistry {
    algorithms: RwLock<HashMap<AlgorithmName, AlgorithmDescriptor>>,
}

impl AlgorithmRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            algorithms: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry seeded with every built-in algorithm
    pub fn with_defaults() -> Self {
        let algorithms = built_in_descriptors()
            .into_iter()
            .map(|descriptor| (descriptor.name().clone(), descriptor))
            .collect();
        Self {
            algorithms: RwLock::new(algorithms),
        }
    }

    /// The process-wide registry
    pub fn shared() -> Arc<AlgorithmRegistry> {
        Arc::clone(&SHARED_REGISTRY)
    }

    /// Look up a descriptor by name
    ///
    /// Returns `None` for unknown names. A poisoned lock also yields `None`,
    /// which callers treat like any other unresolved algorithm.
    pub fn resolve(&self, name: &str) -> Option<AlgorithmDescriptor> {
        let name = AlgorithmName::new(name);
        let algorithms = match self.algorithms.read() {
            Ok(algorithms) => algorithms,
            Err(_) => {
                warn!(algorithm = %name, "algorithm registry lock is poisoned");
                return None;
            }
        };
        algorithms.get(&name).cloned()
    }

    /// Look up a descriptor and require a capability
    ///
    /// A descriptor of another family resolves to `None`.
    pub fn resolve_for(&self, name: &str, capability: Capability) -> Option<AlgorithmDescriptor> {
        self.resolve(name)
            .filter(|descriptor| descriptor.capability() == capability)
    }

    pub fn resolve_symmetric(&self, name: &str) -> Option<SymmetricAlgorithm> {
        match self.resolve(name)? {
            AlgorithmDescriptor::SymmetricCipher(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn resolve_key_wrap(&self, name: &str) -> Option<AesKw> {
        match self.resolve(name)? {
            AlgorithmDescriptor::KeyWrap(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn resolve_asymmetric(&self, name: &str) -> Option<RsaEncryption> {
        match self.resolve(name)? {
            AlgorithmDescriptor::AsymmetricCipher(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn resolve_signature(&self, name: &str) -> Option<SignatureAlgorithm> {
        match self.resolve(name)? {
            AlgorithmDescriptor::AsymmetricSignature(alg) => Some(alg),
            _ => None,
        }
    }

    /// Register a descriptor under `name`, replacing any previous entry
    pub fn register(
        &self,
        name: impl Into<AlgorithmName>,
        descriptor: impl Into<AlgorithmDescriptor>,
    ) -> Result<Option<AlgorithmDescriptor>> {
        let name = name.into().normalized();
        let descriptor = descriptor.into();
        let mut algorithms = self
            .algorithms
            .write()
            .map_err(|_| Error::FailedToAcquireRegistryWriteLock)?;

        debug!(algorithm = %name, capability = %descriptor.capability(), "registering algorithm");
        Ok(algorithms.insert(name, descriptor))
    }

    /// Remove the descriptor registered under `name`
    pub fn unregister(&self, name: &str) -> Result<Option<AlgorithmDescriptor>> {
        let name = AlgorithmName::new(name);
        let mut algorithms = self
            .algorithms
            .write()
            .map_err(|_| Error::FailedToAcquireRegistryWriteLock)?;

        let removed = algorithms.remove(&name);
        debug!(algorithm = %name, removed = removed.is_some(), "unregistering algorithm");
        Ok(removed)
    }

    /// Returns true if `name` is registered
    pub fn contains(&self, name: &str) -> Result<bool> {
        let algorithms = self
            .algorithms
            .read()
            .map_err(|_| Error::FailedToAcquireRegistryReadLock)?;
        Ok(algorithms.contains_key(&AlgorithmName::new(name)))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Result<Vec<AlgorithmName>> {
        let algorithms = self
            .algorithms
            .read()
            .map_err(|_| Error::FailedToAcquireRegistryReadLock)?;
        let mut names: Vec<_> = algorithms.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn built_in_descriptors() -> Vec<AlgorithmDescriptor> {
    use super::{RsaEncryptionPadding, RsaSignaturePadding};
    use crate::crypto::CbcPadding::{None as NoPad, Pkcs7};
    use crate::hash::DigestAlgorithm::{Sha256, Sha384, Sha512};
    use crate::key::KeyCurveName;

    let cbc = |name, bits, padding| SymmetricAlgorithm::AesCbc(AesCbc::new(name, bits, padding));
    let gcm = |name, bits| SymmetricAlgorithm::AesGcm(AesGcm::new(name, bits));
    let ecdsa = |name, curve, digest, coord_len| {
        SignatureAlgorithm::Ecdsa(EcdsaAlgorithm::new(name, curve, digest, coord_len))
    };
    let rsa = |name, padding, digest| {
        SignatureAlgorithm::Rsa(RsaSignatureAlgorithm::new(name, padding, digest))
    };

    let symmetric = [
        cbc(AlgorithmName::A128CBC, 128, NoPad),
        cbc(AlgorithmName::A192CBC, 192, NoPad),
        cbc(AlgorithmName::A256CBC, 256, NoPad),
        cbc(AlgorithmName::A128CBCPAD, 128, Pkcs7),
        cbc(AlgorithmName::A192CBCPAD, 192, Pkcs7),
        cbc(AlgorithmName::A256CBCPAD, 256, Pkcs7),
        gcm(AlgorithmName::A128GCM, 128),
        gcm(AlgorithmName::A192GCM, 192),
        gcm(AlgorithmName::A256GCM, 256),
        SymmetricAlgorithm::AesCbcHmac(AesCbcHmacSha2::a128cbc_hs256()),
        SymmetricAlgorithm::AesCbcHmac(AesCbcHmacSha2::a192cbc_hs384()),
        SymmetricAlgorithm::AesCbcHmac(AesCbcHmacSha2::a256cbc_hs512()),
    ];

    let key_wrap = [
        AesKw::new(AlgorithmName::A128KW, 128),
        AesKw::new(AlgorithmName::A192KW, 192),
        AesKw::new(AlgorithmName::A256KW, 256),
    ];

    let asymmetric = [
        RsaEncryption::new(AlgorithmName::RSA1_5, RsaEncryptionPadding::Pkcs1v15),
        RsaEncryption::new(AlgorithmName::RSA_OAEP, RsaEncryptionPadding::OaepSha1),
        RsaEncryption::new(AlgorithmName::RSA_OAEP_256, RsaEncryptionPadding::OaepSha256),
    ];

    let signature = [
        ecdsa(AlgorithmName::ES256, KeyCurveName::P256, Sha256, 32),
        ecdsa(AlgorithmName::ES256K, KeyCurveName::P256K, Sha256, 32),
        ecdsa(AlgorithmName::ES384, KeyCurveName::P384, Sha384, 48),
        ecdsa(AlgorithmName::ES512, KeyCurveName::P521, Sha512, 66),
        rsa(AlgorithmName::RS256, RsaSignaturePadding::Pkcs1v15, Sha256),
        rsa(AlgorithmName::RS384, RsaSignaturePadding::Pkcs1v15, Sha384),
        rsa(AlgorithmName::RS512, RsaSignaturePadding::Pkcs1v15, Sha512),
        rsa(AlgorithmName::PS256, RsaSignaturePadding::Pss, Sha256),
        rsa(AlgorithmName::PS384, RsaSignaturePadding::Pss, Sha384),
        rsa(AlgorithmName::PS512, RsaSignaturePadding::Pss, Sha512),
    ];

    symmetric
        .into_iter()
        .map(AlgorithmDescriptor::from)
        .chain(key_wrap.into_iter().map(AlgorithmDescriptor::from))
        .chain(asymmetric.into_iter().map(AlgorithmDescriptor::from))
        .chain(signature.into_iter().map(AlgorithmDescriptor::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_defaults_cover_built_in_names() {
        let registry = AlgorithmRegistry::with_defaults();
        for name in AlgorithmName::BUILT_IN {
            let descriptor = registry.resolve(name.as_str()).unwrap();
            assert_eq!(descriptor.name(), name);
        }
        assert_eq!(registry.names().unwrap().len(), AlgorithmName::BUILT_IN.len());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.resolve("a256cbc-hs512").is_some());
        assert!(registry.resolve("rsa-oaep").is_some());
        assert!(registry.resolve("NOPE").is_none());
    }

    #[test]
    fn test_capability_mismatch_does_not_resolve() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.resolve_signature("A128KW").is_none());
        assert!(registry.resolve_key_wrap("A128KW").is_some());
        assert!(registry
            .resolve_for("ES256", Capability::SymmetricCipher)
            .is_none());
        assert!(registry
            .resolve_for("ES256", Capability::AsymmetricSignature)
            .is_some());
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = AlgorithmRegistry::new();
        assert!(registry.resolve("A128KW").is_none());

        let previous = registry
            .register("a128kw", AesKw::new(AlgorithmName::A128KW, 128))
            .unwrap();
        assert!(previous.is_none());
        assert!(registry.contains("A128KW").unwrap());
        assert_eq!(registry.names().unwrap()[0].as_str(), "A128KW");

        let removed = registry.unregister("A128KW").unwrap();
        assert!(removed.is_some());
        assert!(registry.resolve("A128KW").is_none());
        assert!(registry.unregister("A128KW").unwrap().is_none());
    }

    #[test]
    fn test_poisoned_lock() {
        let registry = Arc::new(AlgorithmRegistry::with_defaults());
        let poisoner = Arc::clone(&registry);
        let result = thread::spawn(move || {
            let _guard = poisoner.algorithms.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();
        assert!(result.is_err());

        assert!(registry.resolve("ES256").is_none());
        assert!(matches!(
            registry.contains("ES256"),
            Err(Error::FailedToAcquireRegistryReadLock)
        ));
        assert!(matches!(
            registry.unregister("ES256"),
            Err(Error::FailedToAcquireRegistryWriteLock)
        ));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let registry = Arc::new(AlgorithmRegistry::with_defaults());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..500 {
                        assert!(registry.resolve("ES256").is_some());
                    }
                })
            })
            .collect();

        let writer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100 {
                    registry
                        .register("X-TEST", AesKw::new(AlgorithmName::A128KW, 128))
                        .unwrap();
                    registry.unregister("X-TEST").unwrap();
                }
            })
        };

        for reader in readers {
            reader.join().unwrap();
        }
        writer.join().unwrap();
        assert!(registry.resolve("X-TEST").is_none());
    }

    #[test]
    fn test_shared_registry_is_a_singleton() {
        let a = AlgorithmRegistry::shared();
        let b = AlgorithmRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
