//! Shared length validators and constant-time comparison
//!
//! Every check here runs before a cipher object is created, so a failure
//! never leaves partial cipher state behind.

use crate::error::{Error, Result};
use subtle::ConstantTimeEq;

/// AES block size in bytes, also the CBC IV size
pub const AES_BLOCK_SIZE: usize = 16;

/// AES-GCM nonce size in bytes
pub const GCM_NONCE_SIZE: usize = 12;

/// AES-GCM tag size in bytes
pub const GCM_TAG_SIZE: usize = 16;

/// AES-KW IV (integrity check value) size in bytes
pub const KEY_WRAP_IV_SIZE: usize = 8;

/// Compare two byte sequences without leaking where they differ
///
/// Sequences of different length compare unequal. The running time depends
/// only on the lengths, never on the position of the first mismatch.
pub fn sequence_equal_constant_time(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Ensure `key` is at least `required_bits` long
pub fn validate_min_key_length(algorithm: &str, key: &[u8], required_bits: usize) -> Result<()> {
    let actual_bits = key.len() * 8;
    if actual_bits < required_bits {
        return Err(Error::key_too_short(algorithm, required_bits, actual_bits));
    }
    Ok(())
}

/// Ensure `key` is exactly one of the AES key sizes
pub fn validate_aes_key_length(algorithm: &str, key: &[u8]) -> Result<()> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        len => Err(Error::InvalidKeyMaterial {
            algorithm: algorithm.to_string(),
            reason: format!(
                "key must be 128, 192 or 256 bits, got {} bits",
                len * 8
            ),
        }),
    }
}

/// Ensure an IV has exactly `expected_len` bytes
pub fn validate_iv_length(algorithm: &str, iv: &[u8], expected_len: usize) -> Result<()> {
    if iv.len() != expected_len {
        return Err(Error::wrong_length(
            algorithm,
            "IV",
            expected_len * 8,
            iv.len() * 8,
        ));
    }
    Ok(())
}

/// Ensure an unpadded block cipher input is block aligned
pub fn validate_block_aligned(algorithm: &str, data: &[u8]) -> Result<()> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(Error::InvalidParameter {
            algorithm: algorithm.to_string(),
            reason: format!(
                "input length {} is not a multiple of the {}-byte block size",
                data.len(),
                AES_BLOCK_SIZE
            ),
        });
    }
    Ok(())
}
