//! Symmetric cipher descriptors: AES-CBC, AES-GCM and AES-CBC-HMAC-SHA2
//!
//! Descriptors validate the key, truncate it to their declared size and
//! hand back a one-shot transform. IVs are always supplied by the caller.

use super::AlgorithmName;
use crate::crypto::aes_cbc::{self, CbcPadding};
use crate::crypto::transform::{CryptoTransform, TransformDirection, TransformOutput};
use crate::crypto::validation::{
    validate_block_aligned, validate_iv_length, validate_min_key_length, AES_BLOCK_SIZE,
    GCM_NONCE_SIZE, GCM_TAG_SIZE,
};
use crate::crypto::AesCbcHmacSha2;
use crate::error::{Error, Result};
use aes_gcm::aead::consts::U12;
use aes_gcm::{AeadInPlace, Aes128Gcm, Aes256Gcm, KeyInit, Nonce, Tag};
use zeroize::Zeroizing;

type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, U12>;

/// A symmetric encryption algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymmetricAlgorithm {
    AesCbc(AesCbc),
    AesGcm(AesGcm),
    AesCbcHmac(AesCbcHmacSha2),
}

impl SymmetricAlgorithm {
    pub fn name(&self) -> &AlgorithmName {
        match self {
            SymmetricAlgorithm::AesCbc(alg) => &alg.name,
            SymmetricAlgorithm::AesGcm(alg) => &alg.name,
            SymmetricAlgorithm::AesCbcHmac(alg) => alg.name(),
        }
    }

    /// Minimum key length in bits
    pub fn key_size_bits(&self) -> usize {
        match self {
            SymmetricAlgorithm::AesCbc(alg) => alg.key_size_bits,
            SymmetricAlgorithm::AesGcm(alg) => alg.key_size_bits,
            SymmetricAlgorithm::AesCbcHmac(alg) => alg.key_size_bits(),
        }
    }

    /// IV (or nonce) length in bytes
    pub fn iv_size(&self) -> usize {
        match self {
            SymmetricAlgorithm::AesGcm(_) => GCM_NONCE_SIZE,
            SymmetricAlgorithm::AesCbc(_) | SymmetricAlgorithm::AesCbcHmac(_) => AES_BLOCK_SIZE,
        }
    }

    /// Returns true for modes that produce an authentication tag
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SymmetricAlgorithm::AesCbc(_))
    }

    /// Create an encryptor; `aad` is ignored by unauthenticated modes
    pub fn create_encryptor(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<Box<dyn CryptoTransform>> {
        match self {
            SymmetricAlgorithm::AesCbc(alg) => alg.create_encryptor(key, iv),
            SymmetricAlgorithm::AesGcm(alg) => {
                alg.create_encryptor(key, iv, aad.unwrap_or_default())
            }
            SymmetricAlgorithm::AesCbcHmac(alg) => {
                alg.create_encryptor(key, iv, aad.unwrap_or_default())
            }
        }
    }

    /// Create a decryptor; authenticated modes require `tag`
    pub fn create_decryptor(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: Option<&[u8]>,
        tag: Option<&[u8]>,
    ) -> Result<Box<dyn CryptoTransform>> {
        let aad = aad.unwrap_or_default();
        match self {
            SymmetricAlgorithm::AesCbc(alg) => alg.create_decryptor(key, iv),
            SymmetricAlgorithm::AesGcm(alg) => {
                alg.create_decryptor(key, iv, aad, self.require_tag(tag)?)
            }
            SymmetricAlgorithm::AesCbcHmac(alg) => {
                alg.create_decryptor(key, iv, aad, self.require_tag(tag)?)
            }
        }
    }

    fn require_tag<'a>(&self, tag: Option<&'a [u8]>) -> Result<&'a [u8]> {
        tag.ok_or_else(|| Error::InvalidParameter {
            algorithm: self.name().to_string(),
            reason: "authentication tag is required".to_string(),
        })
    }
}

/// AES in CBC mode, with or without PKCS#7 padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesCbc {
    name: AlgorithmName,
    key_size_bits: usize,
    padding: CbcPadding,
}

impl AesCbc {
    pub const fn new(name: AlgorithmName, key_size_bits: usize, padding: CbcPadding) -> Self {
        Self {
            name,
            key_size_bits,
            padding,
        }
    }

    pub fn padding(&self) -> CbcPadding {
        self.padding
    }

    pub fn create_encryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CryptoTransform>> {
        self.prepare(key, iv, TransformDirection::Encrypt)
    }

    pub fn create_decryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CryptoTransform>> {
        self.prepare(key, iv, TransformDirection::Decrypt)
    }

    fn prepare(
        &self,
        key: &[u8],
        iv: &[u8],
        direction: TransformDirection,
    ) -> Result<Box<dyn CryptoTransform>> {
        validate_min_key_length(self.name.as_str(), key, self.key_size_bits)?;
        validate_iv_length(self.name.as_str(), iv, AES_BLOCK_SIZE)?;

        Ok(Box::new(CbcTransform {
            name: self.name.clone(),
            key: Zeroizing::new(key[..self.key_size_bits / 8].to_vec()),
            iv: iv.to_vec(),
            padding: self.padding,
            direction,
        }))
    }
}

struct CbcTransform {
    name: AlgorithmName,
    key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
    padding: CbcPadding,
    direction: TransformDirection,
}

impl CryptoTransform for CbcTransform {
    fn direction(&self) -> TransformDirection {
        self.direction
    }

    fn finish(self: Box<Self>, input: &[u8]) -> Result<TransformOutput> {
        let name = self.name.as_str();
        let data = match self.direction {
            TransformDirection::Encrypt => {
                if self.padding == CbcPadding::None {
                    validate_block_aligned(name, input)?;
                }
                aes_cbc::encrypt(name, &self.key, &self.iv, input, self.padding)?
            }
            TransformDirection::Decrypt => {
                aes_cbc::decrypt(name, &self.key, &self.iv, input, self.padding)?
            }
        };
        Ok(TransformOutput::data(data))
    }
}

/// AES in GCM mode with a 96-bit nonce and a 128-bit tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesGcm {
    name: AlgorithmName,
    key_size_bits: usize,
}

impl AesGcm {
    pub const fn new(name: AlgorithmName, key_size_bits: usize) -> Self {
        Self {
            name,
            key_size_bits,
        }
    }

    pub fn create_encryptor(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Box<dyn CryptoTransform>> {
        self.prepare(key, nonce, aad, None)
    }

    /// The tag is supplied separately from the ciphertext
    pub fn create_decryptor(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Box<dyn CryptoTransform>> {
        if tag.len() != GCM_TAG_SIZE {
            return Err(Error::wrong_length(
                self.name.as_str(),
                "authentication tag",
                GCM_TAG_SIZE * 8,
                tag.len() * 8,
            ));
        }
        self.prepare(key, nonce, aad, Some(tag.to_vec()))
    }

    fn prepare(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: Option<Vec<u8>>,
    ) -> Result<Box<dyn CryptoTransform>> {
        validate_min_key_length(self.name.as_str(), key, self.key_size_bits)?;
        validate_iv_length(self.name.as_str(), nonce, GCM_NONCE_SIZE)?;

        Ok(Box::new(GcmTransform {
            name: self.name.clone(),
            key: Zeroizing::new(key[..self.key_size_bits / 8].to_vec()),
            nonce: nonce.to_vec(),
            aad: aad.to_vec(),
            tag,
        }))
    }
}

struct GcmTransform {
    name: AlgorithmName,
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
    aad: Vec<u8>,
    /// Present for decryption
    tag: Option<Vec<u8>>,
}

impl CryptoTransform for GcmTransform {
    fn direction(&self) -> TransformDirection {
        if self.tag.is_some() {
            TransformDirection::Decrypt
        } else {
            TransformDirection::Encrypt
        }
    }

    fn finish(self: Box<Self>, input: &[u8]) -> Result<TransformOutput> {
        let nonce = Nonce::from_slice(&self.nonce);
        let mut buffer = input.to_vec();
        let key_error = || Error::InvalidKeyMaterial {
            algorithm: self.name.to_string(),
            reason: "cipher rejected key".to_string(),
        };

        macro_rules! run {
            ($cipher:ty) => {{
                let cipher = <$cipher>::new_from_slice(&self.key).map_err(|_| key_error())?;
                match &self.tag {
                    None => cipher
                        .encrypt_in_place_detached(nonce, &self.aad, &mut buffer)
                        .map(|tag| Some(tag.to_vec())),
                    Some(tag) => cipher
                        .decrypt_in_place_detached(
                            nonce,
                            &self.aad,
                            &mut buffer,
                            Tag::from_slice(tag),
                        )
                        .map(|_| None),
                }
            }};
        }

        let outcome = match self.key.len() {
            16 => run!(Aes128Gcm),
            24 => run!(Aes192Gcm),
            _ => run!(Aes256Gcm),
        };

        match outcome {
            Ok(Some(tag)) => Ok(TransformOutput::with_tag(buffer, tag)),
            Ok(None) => Ok(TransformOutput::data(buffer)),
            Err(_) if self.tag.is_some() => Err(Error::AuthenticationFailure {
                algorithm: self.name.to_string(),
            }),
            Err(_) => Err(Error::Cryptography(format!("{}: encryption failed", self.name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmRegistry;

    fn symmetric(name: &str) -> SymmetricAlgorithm {
        AlgorithmRegistry::with_defaults()
            .resolve_symmetric(name)
            .unwrap()
    }

    #[test]
    fn test_cbc_requires_declared_key_size() {
        let alg = symmetric("A256CBC");
        let err = alg.create_encryptor(&[0u8; 16], &[0u8; 16], None).err().unwrap();
        assert!(matches!(err, Error::InvalidKeyMaterial { .. }));
        assert!(err.to_string().contains("256"));
    }

    #[test]
    fn test_cbc_truncates_longer_key() {
        let alg = symmetric("A128CBC");
        let mut long_key = vec![3u8; 16];
        long_key.extend_from_slice(&[9u8; 16]);

        let a = alg
            .create_encryptor(&long_key, &[0u8; 16], None)
            .unwrap()
            .finish(&[1u8; 32])
            .unwrap();
        let b = alg
            .create_encryptor(&[3u8; 16], &[0u8; 16], None)
            .unwrap()
            .finish(&[1u8; 32])
            .unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_cbc_pad_round_trip() {
        let alg = symmetric("A192CBCPAD");
        let key = [4u8; 24];
        let iv = [5u8; 16];
        let out = alg
            .create_encryptor(&key, &iv, None)
            .unwrap()
            .finish(b"hello")
            .unwrap();
        assert_eq!(out.data.len(), 16);
        assert!(out.tag.is_none());

        let pt = alg
            .create_decryptor(&key, &iv, None, None)
            .unwrap()
            .finish(&out.data)
            .unwrap();
        assert_eq!(pt.data, b"hello");
    }

    #[test]
    fn test_cbc_rejects_short_iv() {
        let alg = symmetric("A128CBC");
        assert!(matches!(
            alg.create_encryptor(&[0u8; 16], &[0u8; 8], None).err(),
            Some(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_gcm_nist_vector() {
        // GCM test case 3 (AES-128, no AAD)
        let key = hex::decode("feffe9928665731c6d6a8f9467308308").unwrap();
        let nonce = hex::decode("cafebabefacedbaddecaf888").unwrap();
        let pt = hex::decode(concat!(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72",
            "1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b391aafd255"
        ))
        .unwrap();

        let out = symmetric("A128GCM")
            .create_encryptor(&key, &nonce, None)
            .unwrap()
            .finish(&pt)
            .unwrap();
        assert_eq!(
            hex::encode(out.tag.as_ref().unwrap()),
            "4d5c2af327cd64a62cf35abd2ba6fab4"
        );
        assert_eq!(
            hex::encode(&out.data[..16]),
            "42831ec2217774244b7221b784d0d49c"
        );
    }

    #[test]
    fn test_gcm_round_trip_and_tamper() {
        for (name, key_len) in [("A128GCM", 16), ("A192GCM", 24), ("A256GCM", 32)] {
            let alg = symmetric(name);
            let key = vec![7u8; key_len];
            let nonce = [1u8; 12];
            let out = alg
                .create_encryptor(&key, &nonce, Some(b"aad"))
                .unwrap()
                .finish(b"attack at dawn")
                .unwrap();
            let tag = out.tag.clone().unwrap();

            let pt = alg
                .create_decryptor(&key, &nonce, Some(b"aad"), Some(&tag))
                .unwrap()
                .finish(&out.data)
                .unwrap();
            assert_eq!(pt.data, b"attack at dawn");

            let err = alg
                .create_decryptor(&key, &nonce, Some(b"aaD"), Some(&tag))
                .unwrap()
                .finish(&out.data)
                .unwrap_err();
            assert!(matches!(err, Error::AuthenticationFailure { .. }));
        }
    }

    #[test]
    fn test_authenticated_decrypt_requires_tag() {
        for name in ["A128GCM", "A128CBC-HS256"] {
            let alg = symmetric(name);
            let iv = vec![0u8; alg.iv_size()];
            assert!(matches!(
                alg.create_decryptor(&[0u8; 32], &iv, None, None).err(),
                Some(Error::InvalidParameter { .. })
            ));
        }
    }
}
