//! Cryptographically secure random generation.
//!
//! Purpose-named generators for the identifiers this provider mints:
//! signing-key ids, token and authorization-code identifiers, client
//! secrets, consent tokens, and SAML message ids.

use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

use crate::hash::to_hex;

/// Generates `len` cryptographically secure random bytes.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generates `byte_len` random bytes and returns them hex-encoded.
#[must_use]
pub fn random_hex(byte_len: usize) -> String {
    to_hex(&random_bytes(byte_len))
}

/// Generates a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates a signing-key identifier: 128 random bits, hex-encoded.
#[must_use]
pub fn generate_key_id() -> String {
    random_hex(16)
}

/// Generates an opaque token or authorization-code identifier.
///
/// 40 alphanumeric characters carry ~238 bits of entropy, well above the
/// 128-bit minimum RFC 6749 recommends for authorization codes.
#[must_use]
pub fn generate_token_id() -> String {
    random_alphanumeric(40)
}

/// Generates a client secret. The plaintext is shown to the administrator
/// exactly once; only its SHA-256 digest is stored.
#[must_use]
pub fn generate_client_secret() -> String {
    random_alphanumeric(40)
}

/// Generates an opaque consent token keying a pending authorization.
#[must_use]
pub fn generate_consent_token() -> String {
    random_alphanumeric(32)
}

/// Generates a SAML message identifier: 21 random bytes hex-encoded with a
/// leading underscore, since XML IDs must not start with a digit.
#[must_use]
pub fn generate_saml_id() -> String {
    format!("_{}", random_hex(21))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_bytes_produces_correct_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert_eq!(random_bytes(64).len(), 64);
    }

    #[test]
    fn random_bytes_produces_different_values() {
        assert_ne!(random_bytes(32), random_bytes(32));
    }

    #[test]
    fn alphanumeric_only_contains_valid_chars() {
        let s = random_alphanumeric(512);
        assert_eq!(s.len(), 512);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn key_id_is_128_bits_hex() {
        let kid = generate_key_id();
        assert_eq!(kid.len(), 32);
        assert!(kid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_token_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn saml_id_shape() {
        let id = generate_saml_id();
        assert!(id.starts_with('_'));
        assert_eq!(id.len(), 43);
    }
}
