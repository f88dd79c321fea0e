//! # idp-crypto
//!
//! Cryptographic operations for the SeAT identity provider.
//!
//! This crate owns the key material used to sign OIDC tokens: keypair
//! generation sized per algorithm, raw signing and verification, and JWK
//! export for the published key set. It also provides the digest and
//! secure-randomness helpers the rest of the workspace builds on.
//!
//! Signing and verification are backed by aws-lc-rs; RSA key generation
//! uses the `rsa` crate since aws-lc-rs only loads existing RSA material.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod keys;
pub mod random;

pub use algorithm::{AlgorithmError, HashAlgorithm, SignatureAlgorithm};
pub use hash::{constant_time_eq, digest, sha256, sha256_hex, to_hex};
pub use keys::{verify_with_public_key, CryptoError, PublicKeyComponents, SigningKeypair};
pub use random::{
    generate_client_secret, generate_consent_token, generate_key_id, generate_saml_id,
    generate_token_id, random_alphanumeric, random_bytes, random_hex,
};
