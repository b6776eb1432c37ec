//! Key material as JSON Web Key
//!
//! A [`JsonWebKey`] carries whatever material the caller has for a key: a
//! full private key, only its public half, or nothing but an identifier and
//! a key type for keys that live in a hardware module. The dispatch clients
//! inspect it to decide whether an operation can run locally.
//!
//! Byte fields are serialized as unpadded base64url, as in RFC 7517.

use crate::error::{Error, Result};
use crate::models::KeyOperation;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JWK key type (`kty`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "EC-HSM")]
    EcHsm,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "RSA-HSM")]
    RsaHsm,
    #[serde(rename = "oct")]
    Oct,
    #[serde(rename = "oct-HSM")]
    OctHsm,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ec => "EC",
            KeyType::EcHsm => "EC-HSM",
            KeyType::Rsa => "RSA",
            KeyType::RsaHsm => "RSA-HSM",
            KeyType::Oct => "oct",
            KeyType::OctHsm => "oct-HSM",
        }
    }

    pub fn is_ec(&self) -> bool {
        matches!(self, KeyType::Ec | KeyType::EcHsm)
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyType::Rsa | KeyType::RsaHsm)
    }

    pub fn is_oct(&self) -> bool {
        matches!(self, KeyType::Oct | KeyType::OctHsm)
    }

    /// HSM-protected keys never expose private material
    pub fn is_hsm(&self) -> bool {
        matches!(self, KeyType::EcHsm | KeyType::RsaHsm | KeyType::OctHsm)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elliptic curve name (`crv`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCurveName {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-256K", alias = "secp256k1")]
    P256K,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl KeyCurveName {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCurveName::P256 => "P-256",
            KeyCurveName::P256K => "P-256K",
            KeyCurveName::P384 => "P-384",
            KeyCurveName::P521 => "P-521",
        }
    }

    /// Length in bytes of one affine coordinate
    pub fn coordinate_len(&self) -> usize {
        match self {
            KeyCurveName::P256 | KeyCurveName::P256K => 32,
            KeyCurveName::P384 => 48,
            KeyCurveName::P521 => 66,
        }
    }
}

impl fmt::Display for KeyCurveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Management attributes of a key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(
        rename = "nbf",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub not_before: Option<DateTime<Utc>>,

    #[serde(
        rename = "exp",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires_on: Option<DateTime<Utc>>,
}

impl KeyAttributes {
    /// Returns true if the key is enabled and `now` lies in its window
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.enabled == Some(false) {
            return false;
        }
        if matches!(self.not_before, Some(not_before) if now < not_before) {
            return false;
        }
        !matches!(self.expires_on, Some(expires_on) if now > expires_on)
    }
}

mod base64url {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| decode(&s).map_err(D::Error::custom))
            .transpose()
    }

    /// Decode unpadded base64url, tolerating trailing padding
    pub fn decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))
    }
}

/// A JSON Web Key
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<KeyType>,

    /// Permitted operations; absent means unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyOperation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<KeyCurveName>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub n: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub e: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub d: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub dp: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub dq: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub qi: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub p: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub q: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub k: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub x: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64url")]
    pub y: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
}

impl JsonWebKey {
    /// Create a key with only an identifier and a key type
    pub fn new(kid: impl Into<String>, kty: KeyType) -> Self {
        Self {
            kid: Some(kid.into()),
            kty: Some(kty),
            ..Default::default()
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_key_ops(mut self, key_ops: Vec<KeyOperation>) -> Self {
        self.key_ops = Some(key_ops);
        self
    }

    pub fn with_attributes(mut self, attributes: KeyAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Key identifier, empty when the key has none
    pub fn key_id(&self) -> &str {
        self.kid.as_deref().unwrap_or_default()
    }

    /// Returns true if the key carries material for private operations
    pub fn has_private_key(&self) -> bool {
        match self.kty {
            Some(KeyType::Ec) | Some(KeyType::Rsa) => self.d.is_some(),
            Some(KeyType::Oct) => self.k.is_some(),
            _ => false,
        }
    }

    /// Copy of this key without private components
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            dp: None,
            dq: None,
            qi: None,
            p: None,
            q: None,
            k: None,
            ..self.clone()
        }
    }

    /// Returns true if `key_ops` is absent or lists `operation`
    pub fn supports_operation(&self, operation: KeyOperation) -> bool {
        self.key_ops
            .as_ref()
            .map_or(true, |ops| ops.contains(&operation))
    }

    /// Returns true if the key is usable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.attributes
            .as_ref()
            .map_or(true, |attributes| attributes.is_valid_at(now))
    }

    /// Parse a key from its JSON Web Key form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wrap a symmetric key given as a base64url string, as in a JWK `k`
    pub fn from_oct_base64url(k: &str) -> Result<Self> {
        Ok(Self::from_oct(base64url::decode(k)?))
    }

    /// Wrap raw symmetric key bytes
    pub fn from_oct(key: impl Into<Vec<u8>>) -> Self {
        Self {
            kty: Some(KeyType::Oct),
            k: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn from_rsa_private_key(key: &RsaPrivateKey) -> Self {
        let primes = key.primes();
        Self {
            kty: Some(KeyType::Rsa),
            n: Some(key.n().to_bytes_be()),
            e: Some(key.e().to_bytes_be()),
            d: Some(key.d().to_bytes_be()),
            p: primes.first().map(BigUint::to_bytes_be),
            q: primes.get(1).map(BigUint::to_bytes_be),
            dp: key.dp().map(BigUint::to_bytes_be),
            dq: key.dq().map(BigUint::to_bytes_be),
            qi: key.crt_coefficient().map(|qi| qi.to_bytes_be()),
            ..Default::default()
        }
    }

    pub fn from_rsa_public_key(key: &RsaPublicKey) -> Self {
        Self {
            kty: Some(KeyType::Rsa),
            n: Some(key.n().to_bytes_be()),
            e: Some(key.e().to_bytes_be()),
            ..Default::default()
        }
    }

    /// Build the RSA public key from `n` and `e`
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey> {
        let (n, e) = match (&self.n, &self.e) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err(self.invalid("RSA key is missing n or e")),
        };
        RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|e| self.invalid(&e.to_string()))
    }

    /// Build the RSA private key from `n`, `e`, `d` and the primes
    pub fn to_rsa_private_key(&self) -> Result<RsaPrivateKey> {
        let (n, e, d) = match (&self.n, &self.e, &self.d) {
            (Some(n), Some(e), Some(d)) => (n, e, d),
            _ => return Err(self.invalid("RSA key is missing n, e or d")),
        };
        let primes = match (&self.p, &self.q) {
            (Some(p), Some(q)) => vec![BigUint::from_bytes_be(p), BigUint::from_bytes_be(q)],
            _ => Vec::new(),
        };
        let mut key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(n),
            BigUint::from_bytes_be(e),
            BigUint::from_bytes_be(d),
            primes,
        )
        .map_err(|e| self.invalid(&e.to_string()))?;
        key.precompute().map_err(|e| self.invalid(&e.to_string()))?;
        Ok(key)
    }

    /// Generate a random symmetric key of `bits` bits
    pub fn generate_oct(bits: usize) -> Result<Self> {
        if bits == 0 || bits % 8 != 0 {
            return Err(Error::InvalidParameter {
                algorithm: KeyType::Oct.to_string(),
                reason: format!("key size must be a positive multiple of 8 bits, got {}", bits),
            });
        }
        let mut key = vec![0u8; bits / 8];
        OsRng.fill_bytes(&mut key);
        Ok(Self::from_oct(key))
    }

    /// Generate an EC key pair on `curve`
    pub fn generate_ec(curve: KeyCurveName) -> Result<Self> {
        macro_rules! generate_with {
            ($curve:ident) => {{
                use $curve::elliptic_curve::sec1::ToEncodedPoint;
                let secret = $curve::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                match (point.x(), point.y()) {
                    (Some(x), Some(y)) => (secret.to_bytes().to_vec(), x.to_vec(), y.to_vec()),
                    _ => return Err(Error::Cryptography(format!("{}: identity point", curve))),
                }
            }};
        }

        let (d, x, y) = match curve {
            #[cfg(feature = "crypto-p256")]
            KeyCurveName::P256 => generate_with!(p256),
            #[cfg(feature = "crypto-secp256k1")]
            KeyCurveName::P256K => generate_with!(k256),
            #[cfg(feature = "crypto-p384")]
            KeyCurveName::P384 => generate_with!(p384),
            #[cfg(feature = "crypto-p521")]
            KeyCurveName::P521 => generate_with!(p521),
            #[allow(unreachable_patterns)]
            _ => {
                return Err(Error::UnsupportedAlgorithm {
                    algorithm: curve.to_string(),
                })
            }
        };

        Ok(Self {
            kty: Some(KeyType::Ec),
            crv: Some(curve),
            d: Some(d),
            x: Some(x),
            y: Some(y),
            ..Default::default()
        })
    }

    /// Generate an RSA key pair with a modulus of `bits` bits
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::Cryptography(format!("RSA key generation failed: {}", e)))?;
        Ok(Self::from_rsa_private_key(&key))
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidKeyMaterial {
            algorithm: self.kty.map(|kty| kty.to_string()).unwrap_or_default(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<Vec<u8>>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("JsonWebKey")
            .field("kid", &self.kid)
            .field("kty", &self.kty)
            .field("key_ops", &self.key_ops)
            .field("crv", &self.crv)
            .field("n", &self.n.as_ref().map(Vec::len))
            .field("e", &self.e)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &redacted(&self.d))
            .field("p", &redacted(&self.p))
            .field("q", &redacted(&self.q))
            .field("dp", &redacted(&self.dp))
            .field("dq", &redacted(&self.dq))
            .field("qi", &redacted(&self.qi))
            .field("k", &redacted(&self.k))
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_key_type_names() {
        assert_eq!(KeyType::Oct.to_string(), "oct");
        assert_eq!(KeyType::RsaHsm.to_string(), "RSA-HSM");
        assert_eq!(serde_json::to_string(&KeyType::OctHsm).unwrap(), r#""oct-HSM""#);
        assert!(KeyType::EcHsm.is_hsm() && KeyType::EcHsm.is_ec());
    }

    #[test]
    fn test_curve_alias() {
        let curve: KeyCurveName = serde_json::from_str(r#""secp256k1""#).unwrap();
        assert_eq!(curve, KeyCurveName::P256K);
        assert_eq!(serde_json::to_string(&curve).unwrap(), r#""P-256K""#);
    }

    #[test]
    fn test_oct_jwk_serialization() {
        let jwk = JsonWebKey::from_oct(vec![0xfb; 16]).with_kid("k1");
        let json = serde_json::to_value(&jwk).unwrap();
        assert_eq!(json["kty"], "oct");
        assert_eq!(json["k"], "-_v7-_v7-_v7-_v7-_v7-w");
        assert!(json.get("d").is_none());

        let parsed: JsonWebKey = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, jwk);
    }

    #[test]
    fn test_from_json() {
        let jwk = JsonWebKey::from_json(
            r#"{"kid":"k2","kty":"oct","key_ops":["wrapKey","unwrapKey"],"k":"AAECAwQFBgcICQoLDA0ODw"}"#,
        )
        .unwrap();
        assert_eq!(jwk.key_id(), "k2");
        assert_eq!(jwk.k, Some((0u8..16).collect()));
        assert!(jwk.supports_operation(KeyOperation::WrapKey));
        assert!(!jwk.supports_operation(KeyOperation::Encrypt));

        let round_tripped = JsonWebKey::from_json(&jwk.to_json().unwrap()).unwrap();
        assert_eq!(round_tripped, jwk);

        assert!(matches!(
            JsonWebKey::from_json("{\"k\": 5}"),
            Err(Error::SerdeError(_))
        ));
    }

    #[test]
    fn test_from_oct_base64url() {
        let jwk = JsonWebKey::from_oct_base64url("-_v7-_v7-_v7-_v7-_v7-w").unwrap();
        assert_eq!(jwk.k, Some(vec![0xfb; 16]));
        assert_eq!(jwk.kty, Some(KeyType::Oct));

        let padded = JsonWebKey::from_oct_base64url("AAECAwQFBgcICQoLDA0ODw==").unwrap();
        assert_eq!(padded.k, Some((0u8..16).collect()));

        assert!(matches!(
            JsonWebKey::from_oct_base64url("not base64!"),
            Err(Error::Base64(_))
        ));
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let jwk = JsonWebKey::from_oct(b"super secret key".to_vec());
        let debug = format!("{:?}", jwk);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("115, 117, 112"));
    }

    #[test]
    fn test_private_material() {
        let jwk = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap();
        assert!(jwk.has_private_key());
        assert_eq!(jwk.x.as_ref().unwrap().len(), 32);

        let public = jwk.to_public();
        assert!(!public.has_private_key());
        assert_eq!(public.x, jwk.x);

        let hsm = JsonWebKey::new("hsm", KeyType::RsaHsm);
        assert!(!hsm.has_private_key());
    }

    #[test]
    fn test_generate_ec_coordinate_lengths() {
        for curve in [KeyCurveName::P384, KeyCurveName::P521] {
            let jwk = JsonWebKey::generate_ec(curve).unwrap();
            assert_eq!(jwk.x.unwrap().len(), curve.coordinate_len());
            assert_eq!(jwk.y.unwrap().len(), curve.coordinate_len());
        }
    }

    #[test]
    fn test_generate_oct() {
        let jwk = JsonWebKey::generate_oct(256).unwrap();
        assert_eq!(jwk.k.unwrap().len(), 32);
        assert!(JsonWebKey::generate_oct(100).is_err());
    }

    #[test]
    fn test_rsa_round_trip() {
        let jwk = JsonWebKey::generate_rsa(1024).unwrap();
        let private = jwk.to_rsa_private_key().unwrap();
        assert_eq!(JsonWebKey::from_rsa_private_key(&private).n, jwk.n);

        let public = jwk.to_public().to_rsa_public_key().unwrap();
        assert_eq!(Some(public.n().to_bytes_be()), jwk.n.clone());
        assert!(jwk.to_public().to_rsa_private_key().is_err());
    }

    #[test]
    fn test_key_ops_and_validity() {
        let now = Utc::now();
        let jwk = JsonWebKey::from_oct(vec![0; 16])
            .with_key_ops(vec![KeyOperation::Encrypt])
            .with_attributes(KeyAttributes {
                enabled: Some(true),
                not_before: Some(now - Duration::hours(1)),
                expires_on: Some(now + Duration::hours(1)),
            });
        assert!(jwk.supports_operation(KeyOperation::Encrypt));
        assert!(!jwk.supports_operation(KeyOperation::Decrypt));
        assert!(jwk.is_valid_at(now));
        assert!(!jwk.is_valid_at(now + Duration::hours(2)));
        assert!(!jwk.is_valid_at(now - Duration::hours(2)));

        let disabled = KeyAttributes {
            enabled: Some(false),
            ..Default::default()
        };
        assert!(!disabled.is_valid_at(now));
    }
}
