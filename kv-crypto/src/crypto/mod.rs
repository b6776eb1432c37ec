//! Cryptographic building blocks shared by the algorithm descriptors
//!
//! This module provides:
//! - One-shot transform handles
//! - AES-CBC with HMAC-SHA2 authenticated encryption (RFC 7518 §5.2)
//! - ECDSA signature conversion between DER and raw `R || S`
//! - Constant-time comparison and key/IV length validators

pub(crate) mod aes_cbc;
pub mod cbc_hmac;
pub mod signature_codec;
pub mod transform;
pub mod validation;

pub use aes_cbc::CbcPadding;
pub use cbc_hmac::AesCbcHmacSha2;
pub use transform::{CryptoTransform, TransformDirection, TransformOutput};
pub use validation::sequence_equal_constant_time;
