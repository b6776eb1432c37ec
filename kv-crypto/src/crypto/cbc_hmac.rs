//! AES-CBC with HMAC-SHA2 authenticated encryption (RFC 7518 §5.2)
//!
//! The supplied key is split in two: the first half keys HMAC, the second
//! half keys AES-CBC. The MAC covers `AAD || IV || ciphertext || AL`, where
//! `AL` is the AAD length in bits as a 64-bit big-endian integer. The tag is
//! the first half of the MAC output.
//!
//! Decryption recomputes the tag and compares it with the supplied tag in
//! constant time before any plaintext is produced.

use crate::algorithm::AlgorithmName;
use crate::crypto::aes_cbc::{self, CbcPadding};
use crate::crypto::transform::{CryptoTransform, TransformDirection, TransformOutput};
use crate::crypto::validation::{
    sequence_equal_constant_time, validate_iv_length, validate_min_key_length, AES_BLOCK_SIZE,
};
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use tracing::warn;
use zeroize::Zeroizing;

/// Descriptor for one AES-CBC-HMAC-SHA2 profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesCbcHmacSha2 {
    name: AlgorithmName,
    /// Size of the AES key; the full key is twice this
    cipher_key_bits: usize,
    digest: DigestAlgorithm,
}

impl AesCbcHmacSha2 {
    pub const fn new(name: AlgorithmName, cipher_key_bits: usize, digest: DigestAlgorithm) -> Self {
        Self {
            name,
            cipher_key_bits,
            digest,
        }
    }

    /// `A128CBC-HS256`
    pub const fn a128cbc_hs256() -> Self {
        Self::new(AlgorithmName::A128CBC_HS256, 128, DigestAlgorithm::Sha256)
    }

    /// `A192CBC-HS384`
    pub const fn a192cbc_hs384() -> Self {
        Self::new(AlgorithmName::A192CBC_HS384, 192, DigestAlgorithm::Sha384)
    }

    /// `A256CBC-HS512`
    pub const fn a256cbc_hs512() -> Self {
        Self::new(AlgorithmName::A256CBC_HS512, 256, DigestAlgorithm::Sha512)
    }

    pub fn name(&self) -> &AlgorithmName {
        &self.name
    }

    /// Minimum key length in bits (MAC key plus cipher key)
    pub fn key_size_bits(&self) -> usize {
        self.cipher_key_bits * 2
    }

    /// Authentication tag length in bytes
    pub fn tag_len(&self) -> usize {
        self.cipher_key_bits / 8
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Create an encryptor bound to `key`, `iv` and `aad`
    pub fn create_encryptor(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
    ) -> Result<Box<dyn CryptoTransform>> {
        let transform = self.prepare(key, iv, aad, TransformDirection::Encrypt, None)?;
        Ok(Box::new(transform))
    }

    /// Create a decryptor that checks `tag` before releasing plaintext
    pub fn create_decryptor(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Box<dyn CryptoTransform>> {
        if tag.len() != self.tag_len() {
            return Err(Error::wrong_length(
                self.name.as_str(),
                "authentication tag",
                self.tag_len() * 8,
                tag.len() * 8,
            ));
        }
        let transform = self.prepare(
            key,
            iv,
            aad,
            TransformDirection::Decrypt,
            Some(tag.to_vec()),
        )?;
        Ok(Box::new(transform))
    }

    fn prepare(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        direction: TransformDirection,
        expected_tag: Option<Vec<u8>>,
    ) -> Result<CbcHmacTransform> {
        validate_min_key_length(self.name.as_str(), key, self.key_size_bits())?;
        validate_iv_length(self.name.as_str(), iv, AES_BLOCK_SIZE)?;

        let half = self.cipher_key_bits / 8;
        let mac_key = Zeroizing::new(key[..half].to_vec());
        let enc_key = Zeroizing::new(key[half..2 * half].to_vec());

        let mut mac = HmacSha2::new(self.digest, &mac_key)?;
        mac.update(aad);
        mac.update(iv);

        Ok(CbcHmacTransform {
            algorithm: self.name.clone(),
            direction,
            enc_key,
            iv: iv.to_vec(),
            aad_bits: (aad.len() as u64) * 8,
            tag_len: self.tag_len(),
            mac,
            expected_tag,
        })
    }
}

/// Keyed MAC over the SHA-2 digest selected by the profile
enum HmacSha2 {
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

impl HmacSha2 {
    fn new(digest: DigestAlgorithm, key: &[u8]) -> Result<Self> {
        let init_failed = |_| Error::Cryptography("HMAC initialization failed".to_string());
        Ok(match digest {
            DigestAlgorithm::Sha256 => {
                HmacSha2::Sha256(Hmac::<Sha256>::new_from_slice(key).map_err(init_failed)?)
            }
            DigestAlgorithm::Sha384 => {
                HmacSha2::Sha384(Hmac::<Sha384>::new_from_slice(key).map_err(init_failed)?)
            }
            DigestAlgorithm::Sha512 => {
                HmacSha2::Sha512(Hmac::<Sha512>::new_from_slice(key).map_err(init_failed)?)
            }
        })
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            HmacSha2::Sha256(h) => h.update(data),
            HmacSha2::Sha384(h) => h.update(data),
            HmacSha2::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            HmacSha2::Sha256(h) => h.finalize().into_bytes().to_vec(),
            HmacSha2::Sha384(h) => h.finalize().into_bytes().to_vec(),
            HmacSha2::Sha512(h) => h.finalize().into_bytes().to_vec(),
        }
    }
}

struct CbcHmacTransform {
    algorithm: AlgorithmName,
    direction: TransformDirection,
    enc_key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
    aad_bits: u64,
    tag_len: usize,
    /// Already primed with `AAD || IV`
    mac: HmacSha2,
    expected_tag: Option<Vec<u8>>,
}

impl CbcHmacTransform {
    fn compute_tag(mut mac: HmacSha2, ciphertext: &[u8], aad_bits: u64, tag_len: usize) -> Vec<u8> {
        mac.update(ciphertext);
        mac.update(&aad_bits.to_be_bytes());
        let mut full = mac.finalize();
        full.truncate(tag_len);
        full
    }
}

impl CryptoTransform for CbcHmacTransform {
    fn direction(&self) -> TransformDirection {
        self.direction
    }

    fn finish(self: Box<Self>, input: &[u8]) -> Result<TransformOutput> {
        let this = *self;
        let algorithm = this.algorithm.as_str();

        match this.direction {
            TransformDirection::Encrypt => {
                let ciphertext =
                    aes_cbc::encrypt(algorithm, &this.enc_key, &this.iv, input, CbcPadding::Pkcs7)?;
                let tag = Self::compute_tag(this.mac, &ciphertext, this.aad_bits, this.tag_len);
                Ok(TransformOutput::with_tag(ciphertext, tag))
            }
            TransformDirection::Decrypt => {
                let expected = this.expected_tag.ok_or_else(|| Error::InvalidParameter {
                    algorithm: algorithm.to_string(),
                    reason: "authentication tag is required".to_string(),
                })?;
                let computed = Self::compute_tag(this.mac, input, this.aad_bits, this.tag_len);

                if !sequence_equal_constant_time(&computed, &expected) {
                    warn!(algorithm = %this.algorithm, "authentication tag mismatch");
                    return Err(Error::AuthenticationFailure {
                        algorithm: algorithm.to_string(),
                    });
                }

                let plaintext =
                    aes_cbc::decrypt(algorithm, &this.enc_key, &this.iv, input, CbcPadding::Pkcs7)?;
                Ok(TransformOutput::data(plaintext))
            }
        }
    }
}
