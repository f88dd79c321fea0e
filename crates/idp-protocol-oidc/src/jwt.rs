//! Compact JWS signing and verification.
//!
//! Tokens are `base64url(header).base64url(claims).base64url(signature)`
//! with the signer chosen by the key's algorithm. Built directly on the
//! crypto primitives so every supported algorithm — including ES512 — signs
//! and verifies the same way.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use idp_crypto::{verify_with_public_key, SignatureAlgorithm, SigningKeypair};

use crate::error::{OidcError, OidcResult};

/// Seconds of clock skew tolerated when validating time claims.
pub const CLOCK_SKEW_LEEWAY_SECS: i64 = 60;

/// JOSE header of an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
    /// JWA algorithm name.
    pub alg: String,

    /// Signing key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type; always "JWT" on issued tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Signs a claim set with the given keypair, embedding its `kid`.
///
/// # Errors
///
/// Returns `server_error` if serialization or signing fails.
pub fn sign_claims(keypair: &SigningKeypair, claims: &Map<String, Value>) -> OidcResult<String> {
    let header = JwsHeader {
        alg: keypair.algorithm().jwa_name().to_string(),
        kid: Some(keypair.key_id().to_string()),
        typ: Some("JWT".to_string()),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| OidcError::ServerError(format!("header serialization: {e}")))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| OidcError::ServerError(format!("claims serialization: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let signature = keypair.sign(signing_input.as_bytes())?;

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// A parsed but not yet verified token.
#[derive(Debug)]
pub struct UnverifiedJwt {
    /// Decoded header.
    pub header: JwsHeader,

    /// Decoded claim set.
    pub claims: Map<String, Value>,

    signing_input: String,
    signature: Vec<u8>,
}

impl UnverifiedJwt {
    /// Splits and decodes a compact token without checking anything.
    ///
    /// # Errors
    ///
    /// Returns `access_denied` if the token is not well-formed.
    pub fn parse(token: &str) -> OidcResult<Self> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(OidcError::AccessDenied(
                "malformed token: expected three segments".to_string(),
            ));
        };

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| OidcError::AccessDenied(format!("malformed token header: {e}")))?;
        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|e| OidcError::AccessDenied(format!("malformed token payload: {e}")))?;
        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|e| OidcError::AccessDenied(format!("malformed token signature: {e}")))?;

        let header: JwsHeader = serde_json::from_slice(&header_json)
            .map_err(|e| OidcError::AccessDenied(format!("invalid token header: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&claims_json)
            .map_err(|e| OidcError::AccessDenied(format!("invalid token payload: {e}")))?;

        Ok(Self {
            header,
            claims,
            signing_input: format!("{header_b64}.{claims_b64}"),
            signature,
        })
    }

    /// Verifies the signature against stored public key material.
    ///
    /// The token's `alg` header must match the key's algorithm; a token
    /// signed under a different key or algorithm fails here.
    ///
    /// # Errors
    ///
    /// Returns `access_denied` on any mismatch.
    pub fn verify_signature(
        &self,
        algorithm: SignatureAlgorithm,
        public_key_der: &[u8],
    ) -> OidcResult<()> {
        if self.header.alg != algorithm.jwa_name() {
            return Err(OidcError::AccessDenied(format!(
                "token algorithm {} does not match key algorithm {}",
                self.header.alg,
                algorithm.jwa_name()
            )));
        }

        verify_with_public_key(
            algorithm,
            public_key_der,
            self.signing_input.as_bytes(),
            &self.signature,
        )
        .map_err(|_| OidcError::AccessDenied("token signature verification failed".to_string()))
    }

    /// Validates `exp` and `nbf` against `now` with clock-skew leeway.
    ///
    /// # Errors
    ///
    /// Returns `access_denied` if the token is expired or not yet valid.
    pub fn validate_time_claims(&self, now: i64) -> OidcResult<()> {
        let exp = self
            .claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| OidcError::AccessDenied("token has no expiry".to_string()))?;

        if now > exp + CLOCK_SKEW_LEEWAY_SECS {
            return Err(OidcError::AccessDenied("token has expired".to_string()));
        }

        if let Some(nbf) = self.claims.get("nbf").and_then(Value::as_i64) {
            if now < nbf - CLOCK_SKEW_LEEWAY_SECS {
                return Err(OidcError::AccessDenied(
                    "token is not yet valid".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Returns a required string claim.
    ///
    /// # Errors
    ///
    /// Returns `access_denied` if the claim is missing or not a string.
    pub fn string_claim(&self, name: &str) -> OidcResult<String> {
        self.claims
            .get(name)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| OidcError::AccessDenied(format!("token is missing claim '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims_with_exp(exp: i64) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("42"));
        claims.insert("exp".to_string(), json!(exp));
        claims
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = sign_claims(&keypair, &claims_with_exp(now + 300)).unwrap();

        let parsed = UnverifiedJwt::parse(&token).unwrap();
        assert_eq!(parsed.header.alg, "ES256");
        assert_eq!(parsed.header.kid.as_deref(), Some(keypair.key_id()));

        parsed
            .verify_signature(keypair.algorithm(), keypair.public_key_der())
            .unwrap();
        parsed.validate_time_claims(now).unwrap();
        assert_eq!(parsed.string_claim("sub").unwrap(), "42");
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = sign_claims(&keypair, &claims_with_exp(now + 300)).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"1\",\"exp\":9999999999}");
        parts[1] = &forged;
        let tampered = parts.join(".");

        let parsed = UnverifiedJwt::parse(&tampered).unwrap();
        assert!(parsed
            .verify_signature(keypair.algorithm(), keypair.public_key_der())
            .is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let signer = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let other = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = sign_claims(&signer, &claims_with_exp(now + 300)).unwrap();

        let parsed = UnverifiedJwt::parse(&token).unwrap();
        assert!(parsed
            .verify_signature(other.algorithm(), other.public_key_der())
            .is_err());
    }

    #[test]
    fn expired_token_is_rejected_with_leeway() {
        let keypair = SigningKeypair::generate(SignatureAlgorithm::Es256).unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = sign_claims(&keypair, &claims_with_exp(now - 30)).unwrap();

        let parsed = UnverifiedJwt::parse(&token).unwrap();
        // Within leeway: still accepted.
        parsed.validate_time_claims(now).unwrap();
        // Beyond leeway: rejected.
        assert!(parsed.validate_time_claims(now + 120).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(UnverifiedJwt::parse("only.two").is_err());
        assert!(UnverifiedJwt::parse("a.b.c.d").is_err());
        assert!(UnverifiedJwt::parse("!!!.???.###").is_err());
    }
}
