//! AES Key Wrap per RFC 3394
//!
//! Wraps content encryption keys under a key encryption key (KEK). The
//! platform provider uses the `aes-kw` crate and always uses the default
//! integrity check value `A6A6A6A6A6A6A6A6`. The RFC 3394 provider runs the
//! wrap loop over the AES block cipher directly and accepts a custom 64-bit
//! IV.

use super::AlgorithmName;
use crate::crypto::transform::{CryptoTransform, TransformDirection, TransformOutput};
use crate::crypto::validation::{
    sequence_equal_constant_time, validate_aes_key_length, validate_iv_length,
    validate_min_key_length, KEY_WRAP_IV_SIZE,
};
use crate::error::{Error, Result};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use aes_kw::Kek;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// RFC 3394 default initial value
pub const DEFAULT_IV: [u8; KEY_WRAP_IV_SIZE] = [0xA6; KEY_WRAP_IV_SIZE];

const SEMIBLOCK: usize = 8;

/// Implementation used for AES key wrap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyWrapProvider {
    /// The `aes-kw` crate; only the default IV
    #[default]
    Platform,
    /// RFC 3394 over the AES block cipher; honors a caller IV
    Rfc3394,
}

/// AES key wrap descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesKw {
    name: AlgorithmName,
    key_size_bits: usize,
}

impl AesKw {
    pub const fn new(name: AlgorithmName, key_size_bits: usize) -> Self {
        Self {
            name,
            key_size_bits,
        }
    }

    pub fn name(&self) -> &AlgorithmName {
        &self.name
    }

    pub fn key_size_bits(&self) -> usize {
        self.key_size_bits
    }

    /// Create a transform that wraps the key passed to `finish`
    pub fn create_encryptor(
        &self,
        key: &[u8],
        iv: Option<&[u8]>,
        provider: KeyWrapProvider,
    ) -> Result<Box<dyn CryptoTransform>> {
        self.prepare(key, iv, provider, TransformDirection::Encrypt)
    }

    /// Create a transform that unwraps the key passed to `finish`
    pub fn create_decryptor(
        &self,
        key: &[u8],
        iv: Option<&[u8]>,
        provider: KeyWrapProvider,
    ) -> Result<Box<dyn CryptoTransform>> {
        self.prepare(key, iv, provider, TransformDirection::Decrypt)
    }

    fn prepare(
        &self,
        key: &[u8],
        iv: Option<&[u8]>,
        provider: KeyWrapProvider,
        direction: TransformDirection,
    ) -> Result<Box<dyn CryptoTransform>> {
        let name = self.name.as_str();
        validate_aes_key_length(name, key)?;
        validate_min_key_length(name, key, self.key_size_bits)?;

        let iv = match iv {
            None => DEFAULT_IV,
            Some(iv) => {
                validate_iv_length(name, iv, KEY_WRAP_IV_SIZE)?;
                if provider == KeyWrapProvider::Platform {
                    return Err(Error::InvalidParameter {
                        algorithm: name.to_string(),
                        reason: "a custom IV requires the RFC 3394 key wrap provider".to_string(),
                    });
                }
                let mut buf = [0u8; KEY_WRAP_IV_SIZE];
                buf.copy_from_slice(iv);
                buf
            }
        };

        Ok(Box::new(KeyWrapTransform {
            name: self.name.clone(),
            kek: Zeroizing::new(key[..self.key_size_bits / 8].to_vec()),
            iv,
            provider,
            direction,
        }))
    }
}

struct KeyWrapTransform {
    name: AlgorithmName,
    kek: Zeroizing<Vec<u8>>,
    iv: [u8; KEY_WRAP_IV_SIZE],
    provider: KeyWrapProvider,
    direction: TransformDirection,
}

impl CryptoTransform for KeyWrapTransform {
    fn direction(&self) -> TransformDirection {
        self.direction
    }

    fn finish(self: Box<Self>, input: &[u8]) -> Result<TransformOutput> {
        let name = self.name.as_str();
        let output = match (self.direction, self.provider) {
            (TransformDirection::Encrypt, KeyWrapProvider::Platform) => {
                check_wrap_input(name, input)?;
                platform_wrap(name, &self.kek, input)?
            }
            (TransformDirection::Decrypt, KeyWrapProvider::Platform) => {
                check_unwrap_input(name, input)?;
                platform_unwrap(name, &self.kek, input)?
            }
            (TransformDirection::Encrypt, KeyWrapProvider::Rfc3394) => {
                check_wrap_input(name, input)?;
                AesBlock::new(name, &self.kek)?.wrap(&self.iv, input)
            }
            (TransformDirection::Decrypt, KeyWrapProvider::Rfc3394) => {
                check_unwrap_input(name, input)?;
                AesBlock::new(name, &self.kek)?.unwrap(name, &self.iv, input)?
            }
        };
        Ok(TransformOutput::data(output))
    }
}

fn check_wrap_input(algorithm: &str, key: &[u8]) -> Result<()> {
    if key.len() < 2 * SEMIBLOCK || key.len() % SEMIBLOCK != 0 {
        return Err(Error::InvalidParameter {
            algorithm: algorithm.to_string(),
            reason: format!(
                "key to wrap must be a multiple of 8 bytes and at least 16 bytes, got {} bytes",
                key.len()
            ),
        });
    }
    Ok(())
}

fn check_unwrap_input(algorithm: &str, wrapped: &[u8]) -> Result<()> {
    if wrapped.len() < 3 * SEMIBLOCK || wrapped.len() % SEMIBLOCK != 0 {
        return Err(Error::InvalidParameter {
            algorithm: algorithm.to_string(),
            reason: format!(
                "wrapped key must be a multiple of 8 bytes and at least 24 bytes, got {} bytes",
                wrapped.len()
            ),
        });
    }
    Ok(())
}

fn platform_wrap(algorithm: &str, kek: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; key.len() + SEMIBLOCK];
    let result = match kek.len() {
        16 => Kek::<Aes128>::from(to_array::<16>(kek)).wrap(key, &mut output),
        24 => Kek::<Aes192>::from(to_array::<24>(kek)).wrap(key, &mut output),
        _ => Kek::<Aes256>::from(to_array::<32>(kek)).wrap(key, &mut output),
    };
    result.map_err(|e| Error::Cryptography(format!("{}: key wrap failed: {:?}", algorithm, e)))?;
    Ok(output)
}

fn platform_unwrap(algorithm: &str, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; wrapped.len() - SEMIBLOCK];
    let result = match kek.len() {
        16 => Kek::<Aes128>::from(to_array::<16>(kek)).unwrap(wrapped, &mut output),
        24 => Kek::<Aes192>::from(to_array::<24>(kek)).unwrap(wrapped, &mut output),
        _ => Kek::<Aes256>::from(to_array::<32>(kek)).unwrap(wrapped, &mut output),
    };
    match result {
        Ok(()) => Ok(output),
        Err(aes_kw::Error::IntegrityCheckFailed) => Err(Error::AuthenticationFailure {
            algorithm: algorithm.to_string(),
        }),
        Err(e) => Err(Error::Cryptography(format!(
            "{}: key unwrap failed: {:?}",
            algorithm, e
        ))),
    }
}

/// Copies a validated KEK into a fixed array
fn to_array<const N: usize>(kek: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&kek[..N]);
    out
}

enum AesBlock {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesBlock {
    fn new(algorithm: &str, kek: &[u8]) -> Result<Self> {
        let invalid = |_| Error::InvalidKeyMaterial {
            algorithm: algorithm.to_string(),
            reason: "cipher rejected key".to_string(),
        };
        Ok(match kek.len() {
            16 => AesBlock::Aes128(Aes128::new_from_slice(kek).map_err(invalid)?),
            24 => AesBlock::Aes192(Aes192::new_from_slice(kek).map_err(invalid)?),
            _ => AesBlock::Aes256(Aes256::new_from_slice(kek).map_err(invalid)?),
        })
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            AesBlock::Aes128(c) => c.encrypt_block(block),
            AesBlock::Aes192(c) => c.encrypt_block(block),
            AesBlock::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut [u8; 16]) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            AesBlock::Aes128(c) => c.decrypt_block(block),
            AesBlock::Aes192(c) => c.decrypt_block(block),
            AesBlock::Aes256(c) => c.decrypt_block(block),
        }
    }

    /// RFC 3394 §2.2.1
    fn wrap(&self, iv: &[u8; KEY_WRAP_IV_SIZE], key: &[u8]) -> Vec<u8> {
        let n = key.len() / SEMIBLOCK;
        let mut a = *iv;
        let mut r = key.to_vec();
        let mut block = [0u8; 16];

        for j in 0..6 {
            for i in 0..n {
                let ri = &mut r[i * SEMIBLOCK..(i + 1) * SEMIBLOCK];
                block[..SEMIBLOCK].copy_from_slice(&a);
                block[SEMIBLOCK..].copy_from_slice(ri);
                self.encrypt(&mut block);

                let t = ((n * j + i + 1) as u64).to_be_bytes();
                for k in 0..SEMIBLOCK {
                    a[k] = block[k] ^ t[k];
                }
                ri.copy_from_slice(&block[SEMIBLOCK..]);
            }
        }

        let mut out = Vec::with_capacity(key.len() + SEMIBLOCK);
        out.extend_from_slice(&a);
        out.extend_from_slice(&r);
        out
    }

    /// RFC 3394 §2.2.2, with the integrity check against `iv`
    fn unwrap(
        &self,
        algorithm: &str,
        iv: &[u8; KEY_WRAP_IV_SIZE],
        wrapped: &[u8],
    ) -> Result<Vec<u8>> {
        let n = wrapped.len() / SEMIBLOCK - 1;
        let mut a = [0u8; SEMIBLOCK];
        a.copy_from_slice(&wrapped[..SEMIBLOCK]);
        let mut r = Zeroizing::new(wrapped[SEMIBLOCK..].to_vec());
        let mut block = [0u8; 16];

        for j in (0..6).rev() {
            for i in (0..n).rev() {
                let ri = &mut r[i * SEMIBLOCK..(i + 1) * SEMIBLOCK];
                let t = ((n * j + i + 1) as u64).to_be_bytes();
                for k in 0..SEMIBLOCK {
                    block[k] = a[k] ^ t[k];
                }
                block[SEMIBLOCK..].copy_from_slice(ri);
                self.decrypt(&mut block);

                a.copy_from_slice(&block[..SEMIBLOCK]);
                ri.copy_from_slice(&block[SEMIBLOCK..]);
            }
        }

        if !sequence_equal_constant_time(&a, iv) {
            return Err(Error::AuthenticationFailure {
                algorithm: algorithm.to_string(),
            });
        }
        Ok(r.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEK_128: &str = "000102030405060708090A0B0C0D0E0F";
    const KEY_DATA: &str = "00112233445566778899AABBCCDDEEFF";
    const WRAPPED_128: &str = "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5";

    fn a128kw() -> AesKw {
        AesKw::new(AlgorithmName::A128KW, 128)
    }

    fn a256kw() -> AesKw {
        AesKw::new(AlgorithmName::A256KW, 256)
    }

    fn run(
        alg: &AesKw,
        kek: &[u8],
        iv: Option<&[u8]>,
        provider: KeyWrapProvider,
        input: &[u8],
        wrap: bool,
    ) -> Result<Vec<u8>> {
        let transform = if wrap {
            alg.create_encryptor(kek, iv, provider)?
        } else {
            alg.create_decryptor(kek, iv, provider)?
        };
        Ok(transform.finish(input)?.data)
    }

    #[test]
    fn test_rfc3394_vector_both_providers() {
        let kek = hex::decode(KEK_128).unwrap();
        let data = hex::decode(KEY_DATA).unwrap();
        let expected = hex::decode(WRAPPED_128).unwrap();

        for provider in [KeyWrapProvider::Platform, KeyWrapProvider::Rfc3394] {
            let wrapped = run(&a128kw(), &kek, None, provider, &data, true).unwrap();
            assert_eq!(wrapped, expected);

            let unwrapped = run(&a128kw(), &kek, None, provider, &wrapped, false).unwrap();
            assert_eq!(unwrapped, data);
        }
    }

    #[test]
    fn test_wrap_produces_longer_output() {
        let kek = [0x42u8; 32];
        let plaintext = [0xABu8; 32];

        let wrapped = run(&a256kw(), &kek, None, KeyWrapProvider::Platform, &plaintext, true)
            .unwrap();
        assert_eq!(wrapped.len(), plaintext.len() + 8);
    }

    #[test]
    fn test_wrong_kek_fails() {
        let plaintext = [0xABu8; 32];
        let wrapped = run(&a256kw(), &[0x42u8; 32], None, KeyWrapProvider::Platform, &plaintext, true)
            .unwrap();

        for provider in [KeyWrapProvider::Platform, KeyWrapProvider::Rfc3394] {
            let err = run(&a256kw(), &[0x43u8; 32], None, provider, &wrapped, false).unwrap_err();
            assert!(matches!(err, Error::AuthenticationFailure { .. }));
        }
    }

    #[test]
    fn test_tampering_detected() {
        let kek = [0x42u8; 32];
        let mut wrapped =
            run(&a256kw(), &kek, None, KeyWrapProvider::Platform, &[0xABu8; 32], true).unwrap();
        wrapped[0] ^= 0xFF;

        assert!(run(&a256kw(), &kek, None, KeyWrapProvider::Platform, &wrapped, false).is_err());
    }

    #[test]
    fn test_custom_iv_requires_rfc3394_provider() {
        let kek = hex::decode(KEK_128).unwrap();
        let data = hex::decode(KEY_DATA).unwrap();
        let iv = [0x01u8; 8];

        let err = run(&a128kw(), &kek, Some(&iv), KeyWrapProvider::Platform, &data, true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        let wrapped = run(&a128kw(), &kek, Some(&iv), KeyWrapProvider::Rfc3394, &data, true)
            .unwrap();
        assert_ne!(wrapped, hex::decode(WRAPPED_128).unwrap());

        let unwrapped = run(&a128kw(), &kek, Some(&iv), KeyWrapProvider::Rfc3394, &wrapped, false)
            .unwrap();
        assert_eq!(unwrapped, data);

        // Unwrapping with the default IV fails the integrity check
        let err = run(&a128kw(), &kek, None, KeyWrapProvider::Rfc3394, &wrapped, false)
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailure { .. }));
    }

    #[test]
    fn test_iv_must_be_64_bits() {
        let err = run(
            &a128kw(),
            &[0u8; 16],
            Some(&[0u8; 12]),
            KeyWrapProvider::Rfc3394,
            &[0u8; 16],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_kek_must_be_an_aes_key_size() {
        // 100, 150 and 200 bits rounded up to whole bytes
        for len in [13usize, 19, 25] {
            let err = a128kw()
                .create_encryptor(&vec![0u8; len], None, KeyWrapProvider::Platform)
                .err()
                .unwrap();
            assert!(matches!(err, Error::InvalidKeyMaterial { .. }));
        }
    }

    #[test]
    fn test_kek_shorter_than_declared_size() {
        let err = a256kw()
            .create_encryptor(&[0u8; 16], None, KeyWrapProvider::Platform)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn test_short_key_rejected() {
        let err = run(&a256kw(), &[0x42u8; 32], None, KeyWrapProvider::Platform, &[0xABu8; 8], true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_non_aligned_key_rejected() {
        let err = run(&a256kw(), &[0x42u8; 32], None, KeyWrapProvider::Rfc3394, &[0xABu8; 17], true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
