//! Signature descriptors: ECDSA (ES*) and RSA (RS*, PS*)
//!
//! Both families sign a pre-computed digest. ECDSA signatures are exchanged
//! in the raw `R || S` form; the curve crates produce and consume DER, so
//! every signature passes through [`crate::crypto::signature_codec`].

use super::AlgorithmName;
use crate::crypto::signature_codec;
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use crate::key::KeyCurveName;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use tracing::debug;

/// A signature algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Ecdsa(EcdsaAlgorithm),
    Rsa(RsaSignatureAlgorithm),
}

impl SignatureAlgorithm {
    pub fn name(&self) -> &AlgorithmName {
        match self {
            SignatureAlgorithm::Ecdsa(alg) => &alg.name,
            SignatureAlgorithm::Rsa(alg) => &alg.name,
        }
    }

    /// Digest the payload must be hashed with before signing
    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::Ecdsa(alg) => alg.digest,
            SignatureAlgorithm::Rsa(alg) => alg.digest,
        }
    }

    pub fn as_ecdsa(&self) -> Option<&EcdsaAlgorithm> {
        match self {
            SignatureAlgorithm::Ecdsa(alg) => Some(alg),
            SignatureAlgorithm::Rsa(_) => None,
        }
    }

    pub fn as_rsa(&self) -> Option<&RsaSignatureAlgorithm> {
        match self {
            SignatureAlgorithm::Rsa(alg) => Some(alg),
            SignatureAlgorithm::Ecdsa(_) => None,
        }
    }
}

fn check_digest(name: &AlgorithmName, expected: DigestAlgorithm, digest: &[u8]) -> Result<()> {
    if digest.len() != expected.output_len() {
        return Err(Error::wrong_length(
            name.as_str(),
            "digest",
            expected.output_len() * 8,
            digest.len() * 8,
        ));
    }
    Ok(())
}

/// ECDSA over one curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaAlgorithm {
    name: AlgorithmName,
    curve: KeyCurveName,
    digest: DigestAlgorithm,
    coord_len: usize,
}

impl EcdsaAlgorithm {
    pub const fn new(
        name: AlgorithmName,
        curve: KeyCurveName,
        digest: DigestAlgorithm,
        coord_len: usize,
    ) -> Self {
        Self {
            name,
            curve,
            digest,
            coord_len,
        }
    }

    pub fn name(&self) -> &AlgorithmName {
        &self.name
    }

    pub fn curve(&self) -> KeyCurveName {
        self.curve
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Required digest length in bytes
    pub fn digest_len(&self) -> usize {
        self.digest.output_len()
    }

    /// Length of one field element (`R` or `S`) in bytes
    pub fn coordinate_len(&self) -> usize {
        self.coord_len
    }

    /// Length of a raw signature in bytes
    pub fn signature_len(&self) -> usize {
        2 * self.coord_len
    }

    fn invalid_key(&self, reason: &str) -> Error {
        Error::InvalidKeyMaterial {
            algorithm: self.name.to_string(),
            reason: reason.to_string(),
        }
    }

    fn curve_unavailable(&self) -> Error {
        Error::UnsupportedAlgorithm {
            algorithm: format!("{} ({} support not compiled in)", self.name, self.curve),
        }
    }

    /// Sign a digest with the private scalar `d`, returning raw `R || S`
    pub fn sign(&self, d: &[u8], digest: &[u8]) -> Result<Vec<u8>> {
        check_digest(&self.name, self.digest, digest)?;

        macro_rules! sign_with {
            ($curve:ident) => {{
                use signature::hazmat::PrehashSigner;
                let signing_key = $curve::ecdsa::SigningKey::from_slice(d)
                    .map_err(|_| self.invalid_key("invalid private key"))?;
                let signature: $curve::ecdsa::Signature = signing_key
                    .sign_prehash(digest)
                    .map_err(|e| Error::Cryptography(format!("{}: {}", self.name, e)))?;
                signature.to_der().as_bytes().to_vec()
            }};
        }

        let der = match self.curve {
            #[cfg(feature = "crypto-p256")]
            KeyCurveName::P256 => sign_with!(p256),
            #[cfg(feature = "crypto-secp256k1")]
            KeyCurveName::P256K => sign_with!(k256),
            #[cfg(feature = "crypto-p384")]
            KeyCurveName::P384 => sign_with!(p384),
            #[cfg(feature = "crypto-p521")]
            KeyCurveName::P521 => sign_with!(p521),
            #[allow(unreachable_patterns)]
            _ => return Err(self.curve_unavailable()),
        };

        signature_codec::to_raw(&der, self.coord_len)
    }

    /// Verify a raw `R || S` signature over a digest with the public point
    ///
    /// Returns `Ok(false)` when the signature does not verify. Malformed
    /// signature encodings and invalid keys are errors.
    pub fn verify(&self, x: &[u8], y: &[u8], digest: &[u8], signature: &[u8]) -> Result<bool> {
        check_digest(&self.name, self.digest, digest)?;
        let der = signature_codec::to_der(signature, self.coord_len)?;
        let point = self.sec1_point(x, y)?;

        macro_rules! verify_with {
            ($curve:ident) => {{
                use signature::hazmat::PrehashVerifier;
                let verifying_key = $curve::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                    .map_err(|_| self.invalid_key("public key is not a point on the curve"))?;
                match $curve::ecdsa::Signature::from_der(&der) {
                    Ok(signature) => verifying_key.verify_prehash(digest, &signature).is_ok(),
                    Err(_) => {
                        debug!(algorithm = %self.name, "signature scalars out of range");
                        false
                    }
                }
            }};
        }

        let valid = match self.curve {
            #[cfg(feature = "crypto-p256")]
            KeyCurveName::P256 => verify_with!(p256),
            #[cfg(feature = "crypto-secp256k1")]
            KeyCurveName::P256K => verify_with!(k256),
            #[cfg(feature = "crypto-p384")]
            KeyCurveName::P384 => verify_with!(p384),
            #[cfg(feature = "crypto-p521")]
            KeyCurveName::P521 => verify_with!(p521),
            #[allow(unreachable_patterns)]
            _ => return Err(self.curve_unavailable()),
        };
        Ok(valid)
    }

    /// Uncompressed SEC1 encoding `04 || X || Y`
    fn sec1_point(&self, x: &[u8], y: &[u8]) -> Result<Vec<u8>> {
        if x.len() > self.coord_len || y.len() > self.coord_len {
            return Err(self.invalid_key("public key coordinate is too long for the curve"));
        }
        let mut point = vec![0u8; 1 + 2 * self.coord_len];
        point[0] = 0x04;
        point[1 + self.coord_len - x.len()..1 + self.coord_len].copy_from_slice(x);
        point[1 + 2 * self.coord_len - y.len()..].copy_from_slice(y);
        Ok(point)
    }
}

/// Padding scheme of an RSA signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaSignaturePadding {
    /// RSASSA-PKCS1-v1_5
    Pkcs1v15,
    /// RSASSA-PSS with MGF1 and a salt as long as the digest
    Pss,
}

/// RSA signature descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaSignatureAlgorithm {
    name: AlgorithmName,
    padding: RsaSignaturePadding,
    digest: DigestAlgorithm,
}

impl RsaSignatureAlgorithm {
    pub const fn new(
        name: AlgorithmName,
        padding: RsaSignaturePadding,
        digest: DigestAlgorithm,
    ) -> Self {
        Self {
            name,
            padding,
            digest,
        }
    }

    pub fn name(&self) -> &AlgorithmName {
        &self.name
    }

    pub fn padding(&self) -> RsaSignaturePadding {
        self.padding
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn sign(&self, key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
        check_digest(&self.name, self.digest, digest)?;
        let mut rng = OsRng;

        let result = match (self.padding, self.digest) {
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha256) => {
                key.sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            }
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha384) => {
                key.sign(Pkcs1v15Sign::new::<Sha384>(), digest)
            }
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha512) => {
                key.sign(Pkcs1v15Sign::new::<Sha512>(), digest)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha256) => {
                key.sign_with_rng(&mut rng, Pss::new::<Sha256>(), digest)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha384) => {
                key.sign_with_rng(&mut rng, Pss::new::<Sha384>(), digest)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha512) => {
                key.sign_with_rng(&mut rng, Pss::new::<Sha512>(), digest)
            }
        };
        result.map_err(|e| Error::Cryptography(format!("{}: signing failed: {}", self.name, e)))
    }

    /// Returns `Ok(false)` when the signature does not verify
    pub fn verify(&self, key: &RsaPublicKey, digest: &[u8], signature: &[u8]) -> Result<bool> {
        check_digest(&self.name, self.digest, digest)?;

        let result = match (self.padding, self.digest) {
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha256) => {
                key.verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
            }
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha384) => {
                key.verify(Pkcs1v15Sign::new::<Sha384>(), digest, signature)
            }
            (RsaSignaturePadding::Pkcs1v15, DigestAlgorithm::Sha512) => {
                key.verify(Pkcs1v15Sign::new::<Sha512>(), digest, signature)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha256) => {
                key.verify(Pss::new::<Sha256>(), digest, signature)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha384) => {
                key.verify(Pss::new::<Sha384>(), digest, signature)
            }
            (RsaSignaturePadding::Pss, DigestAlgorithm::Sha512) => {
                key.verify(Pss::new::<Sha512>(), digest, signature)
            }
        };
        Ok(result.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmRegistry;
    use crate::key::JsonWebKey;

    fn ecdsa(name: &str) -> EcdsaAlgorithm {
        AlgorithmRegistry::with_defaults()
            .resolve_signature(name)
            .and_then(|alg| alg.as_ecdsa().cloned())
            .unwrap()
    }

    #[test]
    fn test_ecdsa_sign_verify_all_curves() {
        for name in ["ES256", "ES256K", "ES384", "ES512"] {
            let alg = ecdsa(name);
            let jwk = JsonWebKey::generate_ec(alg.curve()).unwrap();
            let (d, x, y) = (jwk.d.unwrap(), jwk.x.unwrap(), jwk.y.unwrap());
            let digest = alg.digest().digest(b"payload");

            let signature = alg.sign(&d, &digest).unwrap();
            assert_eq!(signature.len(), alg.signature_len());
            assert!(alg.verify(&x, &y, &digest, &signature).unwrap());

            let other = alg.digest().digest(b"other payload");
            assert!(!alg.verify(&x, &y, &other, &signature).unwrap());

            let mut tampered = signature.clone();
            tampered[3] ^= 0x01;
            assert!(!alg.verify(&x, &y, &digest, &tampered).unwrap());
        }
    }

    #[test]
    fn test_ecdsa_digest_length_checked() {
        let alg = ecdsa("ES384");
        let err = alg.sign(&[1u8; 48], &[0u8; 32]).unwrap_err();
        match err {
            Error::InvalidParameter { algorithm, reason } => {
                assert_eq!(algorithm, "ES384");
                assert!(reason.contains("384 bits"));
                assert!(reason.contains("256 bits"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ecdsa_malformed_raw_signature() {
        let alg = ecdsa("ES256");
        let jwk = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap();
        let digest = [0u8; 32];
        let err = alg
            .verify(
                jwk.x.as_deref().unwrap(),
                jwk.y.as_deref().unwrap(),
                &digest,
                &[0u8; 63],
            )
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSignature(_)));
    }

    #[test]
    fn test_ecdsa_zero_signature_does_not_verify() {
        let alg = ecdsa("ES256");
        let jwk = JsonWebKey::generate_ec(KeyCurveName::P256).unwrap();
        let valid = alg
            .verify(
                jwk.x.as_deref().unwrap(),
                jwk.y.as_deref().unwrap(),
                &[0u8; 32],
                &[0u8; 64],
            )
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_rsa_sign_verify() {
        let key = RsaPrivateKey::new(&mut OsRng, 1536).unwrap();
        let public = key.to_public_key();
        let registry = AlgorithmRegistry::with_defaults();

        for name in ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512"] {
            let alg = registry.resolve_signature(name).unwrap();
            let alg = alg.as_rsa().unwrap();
            let digest = alg.digest().digest(b"payload");

            let signature = alg.sign(&key, &digest).unwrap();
            assert_eq!(signature.len(), 192);
            assert!(alg.verify(&public, &digest, &signature).unwrap());

            let other = alg.digest().digest(b"tampered");
            assert!(!alg.verify(&public, &other, &signature).unwrap());
        }
    }
}
