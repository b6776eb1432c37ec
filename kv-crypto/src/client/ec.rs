//! Local provider for elliptic curve keys
//!
//! EC keys only sign and verify. Encryption and key wrap with an EC key are
//! left to the remote service.

use super::{DelegateReason, KeyContext, LocalCryptographyProvider, LocalOutcome};
use crate::algorithm::{AlgorithmName, Capability, EcdsaAlgorithm};
use crate::config::CryptographyClientOptions;
use crate::error::{Error, Result};
use crate::key::{JsonWebKey, KeyType};
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};

/// Runs ECDSA with the key's `d`, `x` and `y`
#[derive(Debug)]
pub struct EcCryptographyProvider {
    context: KeyContext,
}

impl EcCryptographyProvider {
    pub fn new(key: JsonWebKey, options: CryptographyClientOptions) -> Self {
        Self {
            context: KeyContext::new(key, options),
        }
    }

    fn signer(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
    ) -> Result<LocalOutcome<EcdsaAlgorithm>> {
        let key = &self.context.key;
        let has_material = match operation {
            KeyOperation::Verify => key.x.is_some() && key.y.is_some(),
            _ => key.has_private_key(),
        };
        let descriptor = try_local!(self.context.prepare(
            operation,
            algorithm,
            Capability::AsymmetricSignature,
            has_material,
        )?);
        let Some(ecdsa) = descriptor.as_signature().and_then(|alg| alg.as_ecdsa()) else {
            return Ok(self
                .context
                .delegate(operation, algorithm, DelegateReason::AlgorithmNotResolved));
        };

        if key.crv != Some(ecdsa.curve()) {
            return Err(Error::InvalidKeyMaterial {
                algorithm: ecdsa.name().to_string(),
                reason: format!(
                    "algorithm requires curve {}, key curve is {}",
                    ecdsa.curve(),
                    key.crv
                        .map(|crv| crv.to_string())
                        .unwrap_or_else(|| "unset".to_string())
                ),
            });
        }
        Ok(LocalOutcome::Completed(ecdsa.clone()))
    }

    fn not_local<T>(&self, operation: KeyOperation, algorithm: &AlgorithmName) -> LocalOutcome<T> {
        if self.context.options.force_remote {
            return self
                .context
                .delegate(operation, algorithm, DelegateReason::ForcedRemote);
        }
        self.context.delegate(
            operation,
            algorithm,
            DelegateReason::OperationNotSupportedLocally,
        )
    }

    fn component<'a>(&self, value: &'a Option<Vec<u8>>, alg: &EcdsaAlgorithm) -> Result<&'a [u8]> {
        value.as_deref().ok_or_else(|| Error::InvalidKeyMaterial {
            algorithm: alg.name().to_string(),
            reason: "EC key is missing a component".to_string(),
        })
    }
}

impl LocalCryptographyProvider for EcCryptographyProvider {
    fn key(&self) -> &JsonWebKey {
        &self.context.key
    }

    fn key_type(&self) -> KeyType {
        self.context.key.kty.unwrap_or(KeyType::Ec)
    }

    fn encrypt(&self, parameters: &EncryptParameters) -> Result<LocalOutcome<EncryptResult>> {
        Ok(self.not_local(KeyOperation::Encrypt, &parameters.algorithm))
    }

    fn decrypt(&self, parameters: &DecryptParameters) -> Result<LocalOutcome<DecryptResult>> {
        Ok(self.not_local(KeyOperation::Decrypt, &parameters.algorithm))
    }

    fn sign(&self, algorithm: &AlgorithmName, digest: &[u8]) -> Result<LocalOutcome<SignResult>> {
        let ecdsa = try_local!(self.signer(KeyOperation::Sign, algorithm)?);
        let d = self.component(&self.context.key.d, &ecdsa)?;
        let signature = ecdsa.sign(d, digest)?;
        Ok(LocalOutcome::Completed(SignResult {
            key_id: self.context.key_id().to_string(),
            algorithm: ecdsa.name().clone(),
            signature,
        }))
    }

    fn verify(
        &self,
        algorithm: &AlgorithmName,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<LocalOutcome<VerifyResult>> {
        let ecdsa = try_local!(self.signer(KeyOperation::Verify, algorithm)?);
        let x = self.component(&self.context.key.x, &ecdsa)?;
        let y = self.component(&self.context.key.y, &ecdsa)?;
        let is_valid = ecdsa.verify(x, y, digest, signature)?;
        Ok(LocalOutcome::Completed(VerifyResult {
            key_id: self.context.key_id().to_string(),
            algorithm: ecdsa.name().clone(),
            is_valid,
        }))
    }

    fn wrap_key(&self, algorithm: &AlgorithmName, _key: &[u8]) -> Result<LocalOutcome<WrapResult>> {
        Ok(self.not_local(KeyOperation::WrapKey, algorithm))
    }

    fn unwrap_key(
        &self,
        algorithm: &AlgorithmName,
        _encrypted_key: &[u8],
    ) -> Result<LocalOutcome<UnwrapResult>> {
        Ok(self.not_local(KeyOperation::UnwrapKey, algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::SignatureHashResolver;
    use crate::key::KeyCurveName;
    use assert_matches::assert_matches;

    fn provider(key: JsonWebKey) -> EcCryptographyProvider {
        EcCryptographyProvider::new(key, CryptographyClientOptions::new())
    }

    fn completed<T>(outcome: LocalOutcome<T>) -> T {
        match outcome {
            LocalOutcome::Completed(value) => value,
            LocalOutcome::Delegate(reason) => panic!("unexpected delegation: {}", reason),
        }
    }

    #[test]
    fn test_sign_and_verify_each_curve() {
        for (alg, curve) in [
            (AlgorithmName::ES256, KeyCurveName::P256),
            (AlgorithmName::ES256K, KeyCurveName::P256K),
            (AlgorithmName::ES384, KeyCurveName::P384),
            (AlgorithmName::ES512, KeyCurveName::P521),
        ] {
            let key = JsonWebKey::generate_ec(curve).unwrap().with_kid("ec-key");
            let digest = SignatureHashResolver::hash_for(alg.as_str(), b"payload").unwrap();

            let signed = completed(provider(key.clone()).sign(&alg, &digest).unwrap());
            assert_eq!(signed.signature.len(), 2 * curve.coordinate_len());
            assert_eq!(signed.key_id, "ec-key");

            let verified = completed(
                provider(key.to_public())
                    .verify(&alg, &digest, &signed.signature)
                    .unwrap(),
            );
            assert!(verified.is_valid, "{} did not verify", alg);
        }
    }

    #[test]
    fn test_curve_mismatch() {
        let key = JsonWebKey::generate_ec(KeyCurveName::P384).unwrap();
        assert_matches!(
            provider(key).sign(&AlgorithmName::ES256, &[0; 32]),
            Err(Error::InvalidKeyMaterial { .. })
        );
    }

    #[test]
    fn test_public_key_delegates_sign() {
        let key = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap().to_public();
        assert_eq!(
            provider(key).sign(&AlgorithmName::ES256, &[0; 32]).unwrap(),
            LocalOutcome::Delegate(DelegateReason::KeyMaterialUnavailable)
        );
    }

    #[test]
    fn test_encryption_is_not_local() {
        let key = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap();
        let provider = provider(key);
        let params = EncryptParameters::new(AlgorithmName::RSA_OAEP, b"data".to_vec());
        assert_eq!(
            provider.encrypt(&params).unwrap(),
            LocalOutcome::Delegate(DelegateReason::OperationNotSupportedLocally)
        );
        assert_eq!(
            provider.unwrap_key(&AlgorithmName::A256KW, &[0; 40]).unwrap(),
            LocalOutcome::Delegate(DelegateReason::OperationNotSupportedLocally)
        );
    }

    #[test]
    fn test_unknown_algorithm_delegates() {
        let key = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap();
        assert_eq!(
            provider(key)
                .sign(&AlgorithmName::from("ES256-CUSTOM"), &[0; 32])
                .unwrap(),
            LocalOutcome::Delegate(DelegateReason::AlgorithmNotResolved)
        );
    }
}
