//! # idp-model
//!
//! Domain entities shared by both federation protocols: the read-only
//! projection of the host directory's users, the identity claims derived
//! from it, OAuth2 client applications and their issued tokens, signing
//! keypair records, and SAML service provider registrations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod identity;
pub mod keypair;
pub mod saml;
pub mod token;
pub mod user;

pub use client::ClientApplication;
pub use identity::{Claim, IdentityClaims, Scope};
pub use keypair::SigningKeypairRecord;
pub use saml::SamlServiceProvider;
pub use token::{
    AccessToken, AuthorizationCode, CodeChallengeMethod, PendingAuthorization, RefreshToken,
};
pub use user::{DirectoryUser, MainCharacter};
