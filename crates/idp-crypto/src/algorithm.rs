//! Signature and digest algorithm definitions.
//!
//! The identity provider issues tokens under any of the six JWA asymmetric
//! algorithms. The algorithm is a per-key property: a keypair generated as
//! RS256 stays RS256 for its whole life, so tokens signed before a rotation
//! remain verifiable against their original `kid` even after the active key
//! moves to a different algorithm family.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm parsing and validation.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    /// Algorithm name is not one of the supported JWA values.
    #[error("unsupported algorithm: {0}")]
    Unsupported(String),
}

/// Digest algorithms used across both federation protocols.
///
/// SHA-1 exists solely to verify redirect-binding signatures from legacy
/// SAML service providers; nothing is ever signed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (verification of legacy SAML signatures only).
    #[serde(rename = "SHA1")]
    Sha1,

    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }
}

/// JWA signature algorithms supported for token issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256 (2048-bit keys).
    #[serde(rename = "RS256")]
    Rs256,

    /// RSA PKCS#1 v1.5 with SHA-384 (3072-bit keys).
    #[serde(rename = "RS384")]
    Rs384,

    /// RSA PKCS#1 v1.5 with SHA-512 (4096-bit keys).
    #[serde(rename = "RS512")]
    Rs512,

    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,

    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl SignatureAlgorithm {
    /// Every supported algorithm, in JWA order.
    pub const ALL: [Self; 6] = [
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Es256,
        Self::Es384,
        Self::Es512,
    ];

    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Returns the hash algorithm used by this signature algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::Rs256 | Self::Es256 => HashAlgorithm::Sha256,
            Self::Rs384 | Self::Es384 => HashAlgorithm::Sha384,
            Self::Rs512 | Self::Es512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns whether this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rs256 | Self::Rs384 | Self::Rs512)
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ec(self) -> bool {
        !self.is_rsa()
    }

    /// Returns the RSA modulus size in bits, or `None` for EC algorithms.
    ///
    /// Key sizes scale with the digest: RS256 → 2048, RS384 → 3072,
    /// RS512 → 4096.
    #[must_use]
    pub const fn rsa_key_bits(self) -> Option<usize> {
        match self {
            Self::Rs256 => Some(2048),
            Self::Rs384 => Some(3072),
            Self::Rs512 => Some(4096),
            Self::Es256 | Self::Es384 | Self::Es512 => None,
        }
    }

    /// Returns the JWK curve name, or `None` for RSA algorithms.
    #[must_use]
    pub const fn curve_name(self) -> Option<&'static str> {
        match self {
            Self::Es256 => Some("P-256"),
            Self::Es384 => Some("P-384"),
            Self::Es512 => Some("P-521"),
            Self::Rs256 | Self::Rs384 | Self::Rs512 => None,
        }
    }

    /// Returns the EC coordinate length in bytes, or `None` for RSA.
    #[must_use]
    pub const fn ec_coordinate_len(self) -> Option<usize> {
        match self {
            Self::Es256 => Some(32),
            Self::Es384 => Some(48),
            Self::Es512 => Some(66),
            Self::Rs256 | Self::Rs384 | Self::Rs512 => None,
        }
    }

    /// Parses a JWA algorithm name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a supported JWA algorithm.
    pub fn from_jwa(name: &str) -> Result<Self, AlgorithmError> {
        match name {
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            _ => Err(AlgorithmError::Unsupported(name.to_string())),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.jwa_name())
    }
}
