//! Local provider for symmetric (`oct`) keys

use super::{KeyContext, LocalCryptographyProvider, LocalOutcome};
use crate::algorithm::{AlgorithmDescriptor, AlgorithmName, Capability};
use crate::config::CryptographyClientOptions;
use crate::error::{Error, Result};
use crate::key::{JsonWebKey, KeyType};
use crate::models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Runs symmetric ciphers and AES key wrap with the key's `k`
#[derive(Debug)]
pub struct SymmetricCryptographyProvider {
    context: KeyContext,
}

impl SymmetricCryptographyProvider {
    pub fn new(key: JsonWebKey, options: CryptographyClientOptions) -> Self {
        Self {
            context: KeyContext::new(key, options),
        }
    }

    fn secret(&self) -> Option<&[u8]> {
        self.context.key.k.as_deref()
    }

    fn prepare(
        &self,
        operation: KeyOperation,
        algorithm: &AlgorithmName,
        capability: Capability,
    ) -> Result<LocalOutcome<AlgorithmDescriptor>> {
        self.context
            .prepare(operation, algorithm, capability, self.secret().is_some())
    }

    fn secret_or_err(&self, algorithm: &AlgorithmName) -> Result<&[u8]> {
        self.secret().ok_or_else(|| Error::InvalidKeyMaterial {
            algorithm: algorithm.to_string(),
            reason: "symmetric key has no key material".to_string(),
        })
    }

    fn unsupported(&self, operation: KeyOperation) -> Error {
        Error::UnsupportedOperation {
            operation,
            key_type: self.key_type(),
        }
    }
}

impl LocalCryptographyProvider for SymmetricCryptographyProvider {
    fn key(&self) -> &JsonWebKey {
        &self.context.key
    }

    fn key_type(&self) -> KeyType {
        self.context.key.kty.unwrap_or(KeyType::Oct)
    }

    fn encrypt(&self, parameters: &EncryptParameters) -> Result<LocalOutcome<EncryptResult>> {
        let descriptor = try_local!(self.prepare(
            KeyOperation::Encrypt,
            &parameters.algorithm,
            Capability::SymmetricCipher,
        )?);
        let Some(algorithm) = descriptor.as_symmetric() else {
            return Err(Error::UnsupportedAlgorithm {
                algorithm: parameters.algorithm.to_string(),
            });
        };
        let key = self.secret_or_err(algorithm.name())?;

        let iv = match &parameters.iv {
            Some(iv) => iv.clone(),
            None => {
                let mut iv = vec![0u8; algorithm.iv_size()];
                OsRng.fill_bytes(&mut iv);
                iv
            }
        };
        let aad = parameters.additional_authenticated_data.as_deref();

        let output = algorithm
            .create_encryptor(key, &iv, aad)?
            .finish(&parameters.plaintext)?;

        Ok(LocalOutcome::Completed(EncryptResult {
            key_id: self.context.key_id().to_string(),
            algorithm: algorithm.name().clone(),
            ciphertext: output.data,
            iv: Some(iv),
            authentication_tag: output.tag,
            additional_authenticated_data: if algorithm.is_authenticated() {
                parameters.additional_authenticated_data.clone()
            } else {
                None
            },
        }))
    }

    fn decrypt(&self, parameters: &DecryptParameters) -> Result<LocalOutcome<DecryptResult>> {
        let descriptor = try_local!(self.prepare(
            KeyOperation::Decrypt,
            &parameters.algorithm,
            Capability::SymmetricCipher,
        )?);
        let Some(algorithm) = descriptor.as_symmetric() else {
            return Err(Error::UnsupportedAlgorithm {
                algorithm: parameters.algorithm.to_string(),
            });
        };
        let key = self.secret_or_err(algorithm.name())?;

        let iv = parameters
            .iv
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter {
                algorithm: algorithm.name().to_string(),
                reason: "an initialization vector is required to decrypt".to_string(),
            })?;

        let output = algorithm
            .create_decryptor(
                key,
                iv,
                parameters.additional_authenticated_data.as_deref(),
                parameters.authentication_tag.as_deref(),
            )?
            .finish(&parameters.ciphertext)?;

        Ok(LocalOutcome::Completed(DecryptResult {
            key_id: self.context.key_id().to_string(),
            algorithm: algorithm.name().clone(),
            plaintext: output.data,
        }))
    }

    fn sign(&self, _algorithm: &AlgorithmName, _digest: &[u8]) -> Result<LocalOutcome<SignResult>> {
        Err(self.unsupported(KeyOperation::Sign))
    }

    fn verify(
        &self,
        _algorithm: &AlgorithmName,
        _digest: &[u8],
        _signature: &[u8],
    ) -> Result<LocalOutcome<VerifyResult>> {
        Err(self.unsupported(KeyOperation::Verify))
    }

    fn wrap_key(&self, algorithm: &AlgorithmName, key: &[u8]) -> Result<LocalOutcome<WrapResult>> {
        let descriptor =
            try_local!(self.prepare(KeyOperation::WrapKey, algorithm, Capability::KeyWrap)?);
        let Some(key_wrap) = descriptor.as_key_wrap() else {
            return Err(Error::UnsupportedAlgorithm {
                algorithm: algorithm.to_string(),
            });
        };
        let kek = self.secret_or_err(key_wrap.name())?;

        let output = key_wrap
            .create_encryptor(kek, None, self.context.options.key_wrap_provider)?
            .finish(key)?;

        Ok(LocalOutcome::Completed(WrapResult {
            key_id: self.context.key_id().to_string(),
            algorithm: key_wrap.name().clone(),
            encrypted_key: output.data,
        }))
    }

    fn unwrap_key(
        &self,
        algorithm: &AlgorithmName,
        encrypted_key: &[u8],
    ) -> Result<LocalOutcome<UnwrapResult>> {
        let descriptor =
            try_local!(self.prepare(KeyOperation::UnwrapKey, algorithm, Capability::KeyWrap)?);
        let Some(key_wrap) = descriptor.as_key_wrap() else {
            return Err(Error::UnsupportedAlgorithm {
                algorithm: algorithm.to_string(),
            });
        };
        let kek = self.secret_or_err(key_wrap.name())?;

        let output = key_wrap
            .create_decryptor(kek, None, self.context.options.key_wrap_provider)?
            .finish(encrypted_key)?;

        Ok(LocalOutcome::Completed(UnwrapResult {
            key_id: self.context.key_id().to_string(),
            algorithm: key_wrap.name().clone(),
            key: output.data,
        }))
    }
}
