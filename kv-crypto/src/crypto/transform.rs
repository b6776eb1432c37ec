//! One-shot cryptographic transforms
//!
//! A transform is bound to a key, an IV and a direction when it is created
//! and is consumed by its single [`CryptoTransform::finish`] call.

use crate::error::Result;

/// Direction a transform was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformDirection {
    Encrypt,
    Decrypt,
}

/// Output of a finished transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub data: Vec<u8>,
    /// Authentication tag, produced by authenticated encryptors only
    pub tag: Option<Vec<u8>>,
}

impl TransformOutput {
    pub(crate) fn data(data: Vec<u8>) -> Self {
        Self { data, tag: None }
    }

    pub(crate) fn with_tag(data: Vec<u8>, tag: Vec<u8>) -> Self {
        Self {
            data,
            tag: Some(tag),
        }
    }
}

/// A single-use transform over a complete input
pub trait CryptoTransform: Send {
    /// The direction this transform was created for
    fn direction(&self) -> TransformDirection;

    /// Runs the transform over the whole input, consuming the handle
    fn finish(self: Box<Self>, input: &[u8]) -> Result<TransformOutput>;
}
