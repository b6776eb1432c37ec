//! Client-side cryptography engine
//!
//! This crate runs JSON Web Algorithms locally when it holds the key material
//! they need and hands the operation to a remote key service when it does
//! not. It provides symmetric ciphers (AES-CBC, AES-GCM and the composite
//! AES-CBC-HMAC-SHA2 AEAD), AES key wrap, RSA encryption, ECDSA and RSA
//! signatures, and the DER ⇄ raw codec ECDSA signatures need on the wire.
//!
//! ```no_run
//! use kv_crypto::{CryptographyClient, EncryptParameters, JsonWebKey};
//!
//! # async fn example() -> kv_crypto::Result<()> {
//! let client = CryptographyClient::from_key(JsonWebKey::generate_oct(256)?)?;
//! let encrypted = client
//!     .encrypt(EncryptParameters::new("A128CBC-HS256", b"hello".to_vec()))
//!     .await?;
//! # Ok(())
//! # }
//! ```

/// Algorithm names, descriptors and the registry
pub mod algorithm;

/// Key-type dispatch clients
pub mod client;

/// Client configuration
pub mod config;

/// Cryptographic primitives and transforms
pub mod crypto;

/// Error types
pub mod error;

/// Digests for signature algorithms
pub mod hash;

/// JSON Web Key material
pub mod key;

/// Operation parameters and results
pub mod models;

/// Remote delegation boundary
pub mod remote;

// Re-export key types for convenience
pub use algorithm::{AlgorithmDescriptor, AlgorithmName, AlgorithmRegistry, Capability};
pub use client::{CryptographyClient, DelegateReason, LocalCryptographyProvider, LocalOutcome};
pub use config::CryptographyClientOptions;
pub use crypto::{sequence_equal_constant_time, CryptoTransform, TransformOutput};
pub use error::{Error, Result};
pub use hash::{DigestAlgorithm, SignatureHashResolver};
pub use key::{JsonWebKey, KeyAttributes, KeyCurveName, KeyType};
pub use models::{
    DecryptParameters, DecryptResult, EncryptParameters, EncryptResult, KeyOperation, SignResult,
    UnwrapResult, VerifyResult, WrapResult,
};
pub use remote::RemoteCryptographyClient;

/// Version of the cryptography engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
