//! # idp-protocol-oidc
//!
//! OAuth2 authorization server with `OpenID` Connect extensions for the
//! SeAT identity provider.
//!
//! Implements the authorization-code and refresh-token grants, ID tokens,
//! the `UserInfo` endpoint, JWKS publication, and provider discovery — all
//! against one upstream identity source supplied by the host application.
//!
//! ## Modules
//!
//! - [`error`] - OAuth2 error responses following RFC 6749
//! - [`keyring`] - signing key lifecycle: lazy generation, rotation, JWKS
//! - [`jwt`] - compact JWS signing and verification with `kid` headers
//! - [`jwks`] - JSON Web Key Set types
//! - [`token`] - token issuance and revocation
//! - [`authorize`] - the authorization-code front channel and consent flow
//! - [`grants`] - the token endpoint's grant handling
//! - [`guard`] - bearer-token validation for protected endpoints
//! - [`discovery`] - provider metadata for `.well-known`
//! - [`endpoints`] - axum handlers and router

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorize;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod grants;
pub mod guard;
pub mod jwks;
pub mod jwt;
pub mod keyring;
pub mod token;

pub use authorize::{AuthorizationRequest, AuthorizeOutcome, Authorizer};
pub use discovery::ProviderMetadata;
pub use error::{ErrorResponse, OidcError, OidcResult};
pub use grants::{ClientCredentials, GrantHandler, TokenRequest};
pub use guard::{AuthContext, BearerValidator};
pub use jwks::{JsonWebKey, JsonWebKeySet};
pub use keyring::{KeyManager, KeyringError};
pub use token::{TokenConfig, TokenIssuer, TokenResponse};
