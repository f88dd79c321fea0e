//! # idp-protocol-saml
//!
//! SAML 2.0 identity provider for the SeAT identity provider.
//!
//! Handles SP-initiated single sign-on and single logout over the
//! HTTP-POST and HTTP-Redirect bindings: inbound message decoding,
//! redirect-binding signature verification, response and assertion
//! building, enveloped XML signing, and IdP metadata publication.
//!
//! Each registered service provider carries its own IdP signing
//! credential, generated once at registration — distinct from the OIDC
//! signing keys.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod constants;
pub mod endpoints;
pub mod error;
pub mod metadata;
pub mod request;
pub mod response;
pub mod signature;

pub use bindings::Binding;
pub use error::{SamlError, SamlResult};
pub use request::{ParsedAuthnRequest, ParsedLogoutRequest};
