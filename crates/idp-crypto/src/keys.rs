//! Signing keypair management.
//!
//! A [`SigningKeypair`] couples key material with the algorithm it was
//! generated for. RSA material is generated through the `rsa` crate (sized
//! per algorithm) and ECDSA material through aws-lc-rs PKCS#8 generation;
//! both are held as loaded aws-lc-rs key pairs for signing.
//!
//! ECDSA signatures use the fixed-length (r || s) encoding required by JOSE,
//! not ASN.1 DER.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    self, EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair, RsaKeyPair, UnparsedPublicKey,
    VerificationAlgorithm,
};
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

use crate::algorithm::SignatureAlgorithm;

/// Error type for key operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Key material could not be loaded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Algorithm not usable for this operation.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Public key parameters in the form JWKs are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyComponents {
    /// RSA modulus and exponent, big-endian without leading zeros.
    Rsa {
        /// Modulus bytes.
        n: Vec<u8>,
        /// Public exponent bytes.
        e: Vec<u8>,
    },
    /// EC curve point.
    Ec {
        /// JWK curve name.
        curve: &'static str,
        /// X coordinate, fixed length for the curve.
        x: Vec<u8>,
        /// Y coordinate, fixed length for the curve.
        y: Vec<u8>,
    },
}

enum KeypairInner {
    Rsa(RsaKeyPair),
    Ec(EcdsaKeyPair),
}

/// An asymmetric signing keypair bound to one algorithm for life.
pub struct SigningKeypair {
    key_id: String,
    algorithm: SignatureAlgorithm,
    private_key_der: Vec<u8>,
    public_key_der: Vec<u8>,
    inner: KeypairInner,
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("private_key_der", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SigningKeypair {
    /// Generates fresh key material for the given algorithm.
    ///
    /// RSA keys are sized per algorithm (2048/3072/4096 bits); EC keys use
    /// the curve matching the digest (P-256/P-384/P-521). The key id is 128
    /// random bits, hex-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self, CryptoError> {
        let key_id = crate::random::generate_key_id();

        if let Some(bits) = algorithm.rsa_key_bits() {
            let mut rng = rand::rngs::OsRng;
            let private = RsaPrivateKey::new(&mut rng, bits)
                .map_err(|e| CryptoError::KeyGeneration(format!("RSA generation: {e}")))?;

            let private_key_der = private
                .to_pkcs8_der()
                .map_err(|e| CryptoError::KeyGeneration(format!("PKCS#8 export: {e}")))?
                .as_bytes()
                .to_vec();

            let public_key_der = private
                .to_public_key()
                .to_public_key_der()
                .map_err(|e| CryptoError::KeyGeneration(format!("SPKI export: {e}")))?
                .as_bytes()
                .to_vec();

            Self::from_der(key_id, algorithm, private_key_der, public_key_der)
        } else {
            let signing_alg = ecdsa_signing_algorithm(algorithm)?;
            let rng = SystemRandom::new();
            let document = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng)
                .map_err(|e| CryptoError::KeyGeneration(format!("ECDSA generation: {e}")))?;
            let private_key_der = document.as_ref().to_vec();

            let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, &private_key_der)
                .map_err(|e| CryptoError::InvalidKey(format!("generated ECDSA key: {e}")))?;
            let public_key_der = key_pair.public_key().as_ref().to_vec();

            Ok(Self {
                key_id,
                algorithm,
                private_key_der,
                public_key_der,
                inner: KeypairInner::Ec(key_pair),
            })
        }
    }

    /// Loads a keypair from stored DER material.
    ///
    /// The private key is PKCS#8 DER. The public key is SubjectPublicKeyInfo
    /// DER for RSA and the uncompressed curve point for EC.
    ///
    /// # Errors
    ///
    /// Returns an error if the material does not parse for the algorithm.
    pub fn from_der(
        key_id: String,
        algorithm: SignatureAlgorithm,
        private_key_der: Vec<u8>,
        public_key_der: Vec<u8>,
    ) -> Result<Self, CryptoError> {
        let inner = if algorithm.is_rsa() {
            let key_pair = RsaKeyPair::from_pkcs8(&private_key_der)
                .map_err(|e| CryptoError::InvalidKey(format!("RSA PKCS#8: {e}")))?;
            KeypairInner::Rsa(key_pair)
        } else {
            let signing_alg = ecdsa_signing_algorithm(algorithm)?;
            let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, &private_key_der)
                .map_err(|e| CryptoError::InvalidKey(format!("ECDSA PKCS#8: {e}")))?;
            KeypairInner::Ec(key_pair)
        };

        Ok(Self {
            key_id,
            algorithm,
            private_key_der,
            public_key_der,
            inner,
        })
    }

    /// Returns the key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Returns the PKCS#8 DER private key for persistence.
    #[must_use]
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key_der
    }

    /// Returns the public key DER for persistence and verification.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Signs the given data with this key's algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let rng = SystemRandom::new();

        match &self.inner {
            KeypairInner::Rsa(key_pair) => {
                let padding = match self.algorithm {
                    SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
                    SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
                    SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
                    other => {
                        return Err(CryptoError::UnsupportedAlgorithm(format!(
                            "{other} is not an RSA algorithm"
                        )));
                    }
                };

                let mut sig = vec![0u8; key_pair.public_modulus_len()];
                key_pair
                    .sign(padding, &rng, data, &mut sig)
                    .map_err(|e| CryptoError::Signing(format!("RSA: {e}")))?;
                Ok(sig)
            }
            KeypairInner::Ec(key_pair) => {
                let sig = key_pair
                    .sign(&rng, data)
                    .map_err(|e| CryptoError::Signing(format!("ECDSA: {e}")))?;
                Ok(sig.as_ref().to_vec())
            }
        }
    }

    /// Verifies a signature against this keypair's public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Verification`] if the signature is invalid.
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> Result<(), CryptoError> {
        verify_with_public_key(self.algorithm, &self.public_key_der, data, sig)
    }

    /// Returns the public key parameters used to build the JWK.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored public key material does not parse.
    pub fn public_components(&self) -> Result<PublicKeyComponents, CryptoError> {
        if self.algorithm.is_rsa() {
            let public = RsaPublicKey::from_public_key_der(&self.public_key_der)
                .map_err(|e| CryptoError::InvalidKey(format!("RSA SPKI: {e}")))?;

            Ok(PublicKeyComponents::Rsa {
                n: public.n().to_bytes_be(),
                e: public.e().to_bytes_be(),
            })
        } else {
            let coord_len = self
                .algorithm
                .ec_coordinate_len()
                .ok_or_else(|| CryptoError::UnsupportedAlgorithm(self.algorithm.to_string()))?;
            let curve = self
                .algorithm
                .curve_name()
                .ok_or_else(|| CryptoError::UnsupportedAlgorithm(self.algorithm.to_string()))?;

            // Uncompressed point: 0x04 || x || y.
            let point = &self.public_key_der;
            if point.len() != 1 + coord_len * 2 || point[0] != 0x04 {
                return Err(CryptoError::InvalidKey(
                    "EC public key is not an uncompressed point".to_string(),
                ));
            }

            Ok(PublicKeyComponents::Ec {
                curve,
                x: point[1..=coord_len].to_vec(),
                y: point[1 + coord_len..].to_vec(),
            })
        }
    }
}

/// Verifies a signature against stored public key material.
///
/// The verifier is derived from the algorithm, never hardcoded to one
/// family: RSA keys verify against SubjectPublicKeyInfo DER, EC keys
/// against the uncompressed curve point, with fixed-length signatures.
///
/// # Errors
///
/// Returns [`CryptoError::Verification`] if the signature does not match.
pub fn verify_with_public_key(
    algorithm: SignatureAlgorithm,
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
) -> Result<(), CryptoError> {
    let verification_alg: &'static dyn VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
        SignatureAlgorithm::Es256 => &signature::ECDSA_P256_SHA256_FIXED,
        SignatureAlgorithm::Es384 => &signature::ECDSA_P384_SHA384_FIXED,
        SignatureAlgorithm::Es512 => &signature::ECDSA_P521_SHA512_FIXED,
    };

    UnparsedPublicKey::new(verification_alg, public_key_der)
        .verify(data, sig)
        .map_err(|_| CryptoError::Verification)
}

fn ecdsa_signing_algorithm(
    algorithm: SignatureAlgorithm,
) -> Result<&'static EcdsaSigningAlgorithm, CryptoError> {
    match algorithm {
        SignatureAlgorithm::Es256 => Ok(&signature::ECDSA_P256_SHA256_FIXED_SIGNING),
        SignatureAlgorithm::Es384 => Ok(&signature::ECDSA_P384_SHA384_FIXED_SIGNING),
        SignatureAlgorithm::Es512 => Ok(&signature::ECDSA_P521_SHA512_FIXED_SIGNING),
        other => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{other} is not an ECDSA algorithm"
        ))),
    }
}
