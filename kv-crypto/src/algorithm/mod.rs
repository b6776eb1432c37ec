//! Algorithm names and descriptors
//!
//! Every supported algorithm is described by an [`AlgorithmDescriptor`],
//! a closed union over the four capability families. Descriptors carry only
//! the fixed parameters of their family and hold no per-operation state.

pub mod asymmetric;
pub mod key_wrap;
pub mod registry;
pub mod signature;
pub mod symmetric;

pub use asymmetric::{RsaEncryption, RsaEncryptionPadding};
pub use key_wrap::{AesKw, KeyWrapProvider};
pub use registry::AlgorithmRegistry;
pub use self::signature::{
    EcdsaAlgorithm, RsaSignatureAlgorithm, RsaSignaturePadding, SignatureAlgorithm,
};
pub use symmetric::{AesCbc, AesGcm, SymmetricAlgorithm};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A JWA algorithm identifier such as `A128CBC-HS256` or `ES256`
///
/// Names compare, hash and order ignoring ASCII case but keep the spelling
/// they were created with, so a delegated operation hands the remote service
/// exactly the name the caller passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AlgorithmName(Cow<'static, str>);

macro_rules! algorithm_names {
    ($($(#[$doc:meta])* $ident:ident => $wire:literal,)*) => {
        impl AlgorithmName {
            $(
                $(#[$doc])*
                pub const $ident: AlgorithmName = AlgorithmName(Cow::Borrowed($wire));
            )*

            /// All built-in algorithm names
            pub const BUILT_IN: &'static [AlgorithmName] = &[$(AlgorithmName::$ident),*];
        }
    };
}

algorithm_names! {
    /// AES-128-CBC without padding
    A128CBC => "A128CBC",
    A192CBC => "A192CBC",
    A256CBC => "A256CBC",
    /// AES-128-CBC with PKCS#7 padding
    A128CBCPAD => "A128CBCPAD",
    A192CBCPAD => "A192CBCPAD",
    A256CBCPAD => "A256CBCPAD",
    /// AES-128-GCM
    A128GCM => "A128GCM",
    A192GCM => "A192GCM",
    A256GCM => "A256GCM",
    /// AES-128-CBC with HMAC-SHA256 (RFC 7518 §5.2.3)
    A128CBC_HS256 => "A128CBC-HS256",
    A192CBC_HS384 => "A192CBC-HS384",
    A256CBC_HS512 => "A256CBC-HS512",
    /// AES-128 key wrap (RFC 3394)
    A128KW => "A128KW",
    A192KW => "A192KW",
    A256KW => "A256KW",
    /// RSAES-PKCS1-v1_5
    RSA1_5 => "RSA1_5",
    /// RSAES-OAEP with SHA-1
    RSA_OAEP => "RSA-OAEP",
    /// RSAES-OAEP with SHA-256
    RSA_OAEP_256 => "RSA-OAEP-256",
    /// ECDSA on P-256 with SHA-256
    ES256 => "ES256",
    /// ECDSA on secp256k1 with SHA-256
    ES256K => "ES256K",
    ES384 => "ES384",
    ES512 => "ES512",
    /// RSASSA-PKCS1-v1_5 with SHA-256
    RS256 => "RS256",
    RS384 => "RS384",
    RS512 => "RS512",
    /// RSASSA-PSS with SHA-256
    PS256 => "PS256",
    PS384 => "PS384",
    PS512 => "PS512",
}

impl AlgorithmName {
    /// Create a name, keeping the caller's spelling
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        // Skip the allocation when the name is spelled like a built-in.
        if let Some(known) = Self::BUILT_IN.iter().find(|known| known.0 == name) {
            return known.clone();
        }
        AlgorithmName(Cow::Owned(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The upper-case form used as a registry key
    pub fn normalized(&self) -> AlgorithmName {
        if let Some(known) = Self::BUILT_IN
            .iter()
            .find(|known| known.0.eq_ignore_ascii_case(&self.0))
        {
            return known.clone();
        }
        AlgorithmName(Cow::Owned(self.0.to_ascii_uppercase()))
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_uppercase())
    }
}

impl PartialEq for AlgorithmName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for AlgorithmName {}

impl Hash for AlgorithmName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for AlgorithmName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AlgorithmName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AlgorithmName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlgorithmName {
    fn from(name: &str) -> Self {
        AlgorithmName::new(name)
    }
}

impl From<String> for AlgorithmName {
    fn from(name: String) -> Self {
        AlgorithmName::new(name)
    }
}

impl From<&AlgorithmName> for AlgorithmName {
    fn from(name: &AlgorithmName) -> Self {
        name.clone()
    }
}

impl From<AlgorithmName> for String {
    fn from(name: AlgorithmName) -> Self {
        name.0.into_owned()
    }
}

impl FromStr for AlgorithmName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(AlgorithmName::new(s))
    }
}

/// Capability family of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SymmetricCipher,
    KeyWrap,
    AsymmetricCipher,
    AsymmetricSignature,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::SymmetricCipher => "symmetric cipher",
            Capability::KeyWrap => "key wrap",
            Capability::AsymmetricCipher => "asymmetric cipher",
            Capability::AsymmetricSignature => "asymmetric signature",
        };
        f.write_str(name)
    }
}

/// A resolved algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmDescriptor {
    SymmetricCipher(SymmetricAlgorithm),
    KeyWrap(AesKw),
    AsymmetricCipher(RsaEncryption),
    AsymmetricSignature(SignatureAlgorithm),
}

impl AlgorithmDescriptor {
    pub fn name(&self) -> &AlgorithmName {
        match self {
            AlgorithmDescriptor::SymmetricCipher(alg) => alg.name(),
            AlgorithmDescriptor::KeyWrap(alg) => alg.name(),
            AlgorithmDescriptor::AsymmetricCipher(alg) => alg.name(),
            AlgorithmDescriptor::AsymmetricSignature(alg) => alg.name(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            AlgorithmDescriptor::SymmetricCipher(_) => Capability::SymmetricCipher,
            AlgorithmDescriptor::KeyWrap(_) => Capability::KeyWrap,
            AlgorithmDescriptor::AsymmetricCipher(_) => Capability::AsymmetricCipher,
            AlgorithmDescriptor::AsymmetricSignature(_) => Capability::AsymmetricSignature,
        }
    }

    pub fn as_symmetric(&self) -> Option<&SymmetricAlgorithm> {
        match self {
            AlgorithmDescriptor::SymmetricCipher(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn as_key_wrap(&self) -> Option<&AesKw> {
        match self {
            AlgorithmDescriptor::KeyWrap(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn as_asymmetric(&self) -> Option<&RsaEncryption> {
        match self {
            AlgorithmDescriptor::AsymmetricCipher(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&SignatureAlgorithm> {
        match self {
            AlgorithmDescriptor::AsymmetricSignature(alg) => Some(alg),
            _ => None,
        }
    }
}

impl From<SymmetricAlgorithm> for AlgorithmDescriptor {
    fn from(alg: SymmetricAlgorithm) -> Self {
        AlgorithmDescriptor::SymmetricCipher(alg)
    }
}

impl From<AesKw> for AlgorithmDescriptor {
    fn from(alg: AesKw) -> Self {
        AlgorithmDescriptor::KeyWrap(alg)
    }
}

impl From<RsaEncryption> for AlgorithmDescriptor {
    fn from(alg: RsaEncryption) -> Self {
        AlgorithmDescriptor::AsymmetricCipher(alg)
    }
}

impl From<SignatureAlgorithm> for AlgorithmDescriptor {
    fn from(alg: SignatureAlgorithm) -> Self {
        AlgorithmDescriptor::AsymmetricSignature(alg)
    }
}
