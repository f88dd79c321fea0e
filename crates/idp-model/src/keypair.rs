//! Persisted signing keypair records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use idp_crypto::{CryptoError, SignatureAlgorithm, SigningKeypair};

/// The stored form of an OIDC signing keypair.
///
/// Invariant (enforced by the keypair store): at most one record is active
/// at any time, and an active record must not be deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKeypairRecord {
    /// Opaque unique key identifier; the JWT header `kid`.
    pub key_id: String,

    /// Algorithm this key was generated for; fixed for the key's lifetime.
    pub algorithm: SignatureAlgorithm,

    /// PKCS#8 DER private key.
    #[serde(skip_serializing)]
    pub private_key_der: Vec<u8>,

    /// Public key DER (SubjectPublicKeyInfo for RSA, uncompressed point for
    /// EC).
    pub public_key_der: Vec<u8>,

    /// Whether this is the key currently used for signing.
    pub is_active: bool,

    /// Optional expiry; expired keys are excluded from the published set.
    pub expires_at: Option<DateTime<Utc>>,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SigningKeypairRecord {
    /// Captures freshly generated key material into a record.
    #[must_use]
    pub fn from_keypair(keypair: &SigningKeypair, is_active: bool) -> Self {
        Self {
            key_id: keypair.key_id().to_string(),
            algorithm: keypair.algorithm(),
            private_key_der: keypair.private_key_der().to_vec(),
            public_key_der: keypair.public_key_der().to_vec(),
            is_active,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Loads the record back into a usable signing keypair.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored material does not parse.
    pub fn load(&self) -> Result<SigningKeypair, CryptoError> {
        SigningKeypair::from_der(
            self.key_id.clone(),
            self.algorithm,
            self.private_key_der.clone(),
            self.public_key_der.clone(),
        )
    }

    /// Whether the key has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}
