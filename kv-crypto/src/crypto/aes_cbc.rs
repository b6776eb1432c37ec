//! Raw AES-CBC over the `cbc` crate
//!
//! The key length selects AES-128, AES-192 or AES-256. Callers validate key
//! and IV lengths first.

use crate::crypto::validation::{
    validate_aes_key_length, validate_block_aligned, validate_iv_length, AES_BLOCK_SIZE,
};
use crate::error::{Error, Result};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

/// Block padding applied by a CBC transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbcPadding {
    /// Input must already be a multiple of the block size
    None,
    /// PKCS#7 padding
    Pkcs7,
}

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

fn init_error(algorithm: &str) -> Error {
    Error::InvalidKeyMaterial {
        algorithm: algorithm.to_string(),
        reason: "cipher rejected key or IV".to_string(),
    }
}

pub(crate) fn encrypt(
    algorithm: &str,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
    padding: CbcPadding,
) -> Result<Vec<u8>> {
    validate_aes_key_length(algorithm, key)?;
    validate_iv_length(algorithm, iv, AES_BLOCK_SIZE)?;
    if padding == CbcPadding::None {
        validate_block_aligned(algorithm, data)?;
    }

    macro_rules! run {
        ($enc:ty) => {{
            let enc = <$enc>::new_from_slices(key, iv).map_err(|_| init_error(algorithm))?;
            match padding {
                CbcPadding::None => enc.encrypt_padded_vec_mut::<NoPadding>(data),
                CbcPadding::Pkcs7 => enc.encrypt_padded_vec_mut::<Pkcs7>(data),
            }
        }};
    }

    let ciphertext = match key.len() {
        16 => run!(Aes128CbcEnc),
        24 => run!(Aes192CbcEnc),
        _ => run!(Aes256CbcEnc),
    };
    Ok(ciphertext)
}

pub(crate) fn decrypt(
    algorithm: &str,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
    padding: CbcPadding,
) -> Result<Vec<u8>> {
    validate_aes_key_length(algorithm, key)?;
    validate_iv_length(algorithm, iv, AES_BLOCK_SIZE)?;
    validate_block_aligned(algorithm, data)?;

    macro_rules! run {
        ($dec:ty) => {{
            let dec = <$dec>::new_from_slices(key, iv).map_err(|_| init_error(algorithm))?;
            match padding {
                CbcPadding::None => dec.decrypt_padded_vec_mut::<NoPadding>(data),
                CbcPadding::Pkcs7 => dec.decrypt_padded_vec_mut::<Pkcs7>(data),
            }
        }};
    }

    let plaintext = match key.len() {
        16 => run!(Aes128CbcDec),
        24 => run!(Aes192CbcDec),
        _ => run!(Aes256CbcDec),
    };
    plaintext.map_err(|_| Error::Cryptography(format!("{}: invalid padding", algorithm)))
}
