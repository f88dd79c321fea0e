//! JSON Web Key Set types.
//!
//! Implements the subset of RFC 7517 this provider publishes: public
//! signing keys as `{kty:"RSA", n, e}` or `{kty:"EC", crv, x, y}`, each
//! with `alg`, `use:"sig"`, and `kid`. Integers are base64url-encoded
//! without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use idp_crypto::{CryptoError, PublicKeyComponents, SigningKeypair};

/// Key type for a JWK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key.
    #[serde(rename = "RSA")]
    Rsa,

    /// Elliptic curve key.
    #[serde(rename = "EC")]
    Ec,
}

/// A published public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type.
    pub kty: KeyType,

    /// Public key use; always "sig".
    #[serde(rename = "use")]
    pub key_use: String,

    /// JWA algorithm the key signs with.
    pub alg: String,

    /// Key identifier.
    pub kid: String,

    /// RSA modulus (base64url, unpadded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url, unpadded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url, unpadded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url, unpadded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl JsonWebKey {
    /// Exports a signing keypair's public half as a JWK.
    ///
    /// # Errors
    ///
    /// Returns an error if the public key material does not parse.
    pub fn from_keypair(keypair: &SigningKeypair) -> Result<Self, CryptoError> {
        let mut jwk = Self {
            kty: KeyType::Rsa,
            key_use: "sig".to_string(),
            alg: keypair.algorithm().jwa_name().to_string(),
            kid: keypair.key_id().to_string(),
            n: None,
            e: None,
            crv: None,
            x: None,
            y: None,
        };

        match keypair.public_components()? {
            PublicKeyComponents::Rsa { n, e } => {
                jwk.n = Some(URL_SAFE_NO_PAD.encode(n));
                jwk.e = Some(URL_SAFE_NO_PAD.encode(e));
            }
            PublicKeyComponents::Ec { curve, x, y } => {
                jwk.kty = KeyType::Ec;
                jwk.crv = Some(curve.to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(x));
                jwk.y = Some(URL_SAFE_NO_PAD.encode(y));
            }
        }

        Ok(jwk)
    }
}

/// The published key set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Published keys.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Finds a key by its id.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_crypto::SignatureAlgorithm;

    #[test]
    fn rsa_jwk_shape() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Rs256).unwrap();
        let jwk = JsonWebKey::from_keypair(&keypair).unwrap();

        assert_eq!(jwk.kty, KeyType::Rsa);
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.key_use, "sig");
        assert!(jwk.n.is_some());
        assert!(jwk.e.is_some());
        assert!(jwk.crv.is_none());

        let json = serde_json::to_string(&jwk).unwrap();
        assert!(json.contains("\"kty\":\"RSA\""));
        assert!(json.contains("\"use\":\"sig\""));
        // Unpadded base64url.
        assert!(!json.contains('='));
    }

    #[test]
    fn ec_jwk_shape() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Es384).unwrap();
        let jwk = JsonWebKey::from_keypair(&keypair).unwrap();

        assert_eq!(jwk.kty, KeyType::Ec);
        assert_eq!(jwk.crv.as_deref(), Some("P-384"));
        assert!(jwk.x.is_some());
        assert!(jwk.y.is_some());
        assert!(jwk.n.is_none());
    }

    #[test]
    fn find_key_by_id() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let set = JsonWebKeySet {
            keys: vec![JsonWebKey::from_keypair(&keypair).unwrap()],
        };
        assert!(set.find_key(keypair.key_id()).is_some());
        assert!(set.find_key("missing").is_none());
    }
}
