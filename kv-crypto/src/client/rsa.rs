//! Local provider for RSA keys

use super::{DelegateReason, KeyContext, LocalCryptographyProvider, LocalOutcome};
use crate::algorithm::{AlgorithmName, Capability, RsaEncryption, RsaSignatureAlgorithm};
use crate::config::CryptographyClientOptions;
use crate::error::Result;
use crate::key::{JsonWebKey, KeyType};
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};

/// Runs RSA encryption, key wrap and signatures
///
/// Public operations need `n` and `e`; private ones need `d` as well. Keys
/// of type `RSA-HSM` only ever run public operations locally.
#[derive(Debug)]
pub struct RsaCryptographyProvider {
    context: KeyContext,
}

impl RsaCryptographyProvider {
    pub fn new(key: JsonWebKey, options: CryptographyClientOptions) -> Self {
        Self {
            context: KeyContext::new(key, options),
        }
    }

    fn has_public(&self) -> bool {
        self.context.key.n.is_some() && self.context.key.e.is_some()
    }

    fn cipher(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
    ) -> Result<LocalOutcome<RsaEncryption>> {
        let has_material = if operation.is_public() {
            self.has_public()
        } else {
            self.context.key.has_private_key()
        };
        let descriptor = try_local!(self.context.prepare(
            operation,
            algorithm,
            Capability::AsymmetricCipher,
            has_material,
        )?);
        match descriptor.as_asymmetric() {
            Some(cipher) => Ok(LocalOutcome::Completed(cipher.clone())),
            None => Ok(self
                .context
                .delegate(operation, algorithm, DelegateReason::AlgorithmNotResolved)),
        }
    }

    fn signer(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
    ) -> Result<LocalOutcome<RsaSignatureAlgorithm>> {
        let has_material = if operation.is_public() {
            self.has_public()
        } else {
            self.context.key.has_private_key()
        };
        let descriptor = try_local!(self.context.prepare(
            operation,
            algorithm,
            Capability::AsymmetricSignature,
            has_material,
        )?);
        match descriptor.as_signature().and_then(|alg| alg.as_rsa()) {
            Some(signer) => Ok(LocalOutcome::Completed(signer.clone())),
            None => Ok(self
                .context
                .delegate(operation, algorithm, DelegateReason::AlgorithmNotResolved)),
        }
    }

    fn encrypt_bytes(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        plaintext: &[u8],
    ) -> Result<LocalOutcome<(RsaEncryption, Vec<u8>)>> {
        let cipher = try_local!(self.cipher(operation, algorithm)?);
        let public_key = self.context.key.to_rsa_public_key()?;
        let ciphertext = cipher.encrypt(&public_key, plaintext)?;
        Ok(LocalOutcome::Completed((cipher, ciphertext)))
    }

    fn decrypt_bytes(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        ciphertext: &[u8],
    ) -> Result<LocalOutcome<(RsaEncryption, Vec<u8>)>> {
        let cipher = try_local!(self.cipher(operation, algorithm)?);
        let private_key = self.context.key.to_rsa_private_key()?;
        let plaintext = cipher.decrypt(&private_key, ciphertext)?;
        Ok(LocalOutcome::Completed((cipher, plaintext)))
    }
}

impl LocalCryptographyProvider for RsaCryptographyProvider {
    fn key(&self) -> &JsonWebKey {
        &self.context.key
    }

    fn key_type(&self) -> KeyType {
        self.context.key.kty.unwrap_or(KeyType::Rsa)
    }

    fn encrypt(&self, parameters: &EncryptParameters) -> Result<LocalOutcome<EncryptResult>> {
        let (cipher, ciphertext) = try_local!(self.encrypt_bytes(
            KeyOperation::Encrypt,
            &parameters.algorithm,
            &parameters.plaintext,
        )?);
        Ok(LocalOutcome::Completed(EncryptResult {
            key_id: self.context.key_id().to_string(),
            algorithm: cipher.name().clone(),
            ciphertext,
            iv: None,
            authentication_tag: None,
            additional_authenticated_data: None,
        }))
    }

    fn decrypt(&self, parameters: &DecryptParameters) -> Result<LocalOutcome<DecryptResult>> {
        let (cipher, plaintext) = try_local!(self.decrypt_bytes(
            KeyOperation::Decrypt,
            &parameters.algorithm,
            &parameters.ciphertext,
        )?);
        Ok(LocalOutcome::Completed(DecryptResult {
            key_id: self.context.key_id().to_string(),
            algorithm: cipher.name().clone(),
            plaintext,
        }))
    }

    fn sign(&self, algorithm: &AlgorithmName, digest: &[u8]) -> Result<LocalOutcome<SignResult>> {
        let signer = try_local!(self.signer(KeyOperation::Sign, algorithm)?);
        let private_key = self.context.key.to_rsa_private_key()?;
        let signature = signer.sign(&private_key, digest)?;
        Ok(LocalOutcome::Completed(SignResult {
            key_id: self.context.key_id().to_string(),
            algorithm: signer.name().clone(),
            signature,
        }))
    }

    fn verify(
        &self,
        algorithm: &AlgorithmName,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<LocalOutcome<VerifyResult>> {
        let signer = try_local!(self.signer(KeyOperation::Verify, algorithm)?);
        let public_key = self.context.key.to_rsa_public_key()?;
        let is_valid = signer.verify(&public_key, digest, signature)?;
        Ok(LocalOutcome::Completed(VerifyResult {
            key_id: self.context.key_id().to_string(),
            algorithm: signer.name().clone(),
            is_valid,
        }))
    }

    fn wrap_key(&self, algorithm: &AlgorithmName, key: &[u8]) -> Result<LocalOutcome<WrapResult>> {
        let (cipher, encrypted_key) =
            try_local!(self.encrypt_bytes(KeyOperation::WrapKey, algorithm, key)?);
        Ok(LocalOutcome::Completed(WrapResult {
            key_id: self.context.key_id().to_string(),
            algorithm: cipher.name().clone(),
            encrypted_key,
        }))
    }

    fn unwrap_key(
        &self,
        algorithm: &AlgorithmName,
        encrypted_key: &[u8],
    ) -> Result<LocalOutcome<UnwrapResult>> {
        let (cipher, key) =
            try_local!(self.decrypt_bytes(KeyOperation::UnwrapKey, algorithm, encrypted_key)?);
        Ok(LocalOutcome::Completed(UnwrapResult {
            key_id: self.context.key_id().to_string(),
            algorithm: cipher.name().clone(),
            key,
        }))
    }
}
