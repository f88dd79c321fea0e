//! OAuth2 / OIDC protocol error types.
//!
//! Errors carry both the RFC 6749 machine-readable error code and the HTTP
//! status the response must use. Unexpected internal failures collapse into
//! `server_error` so nothing leaks beyond the top-level message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use idp_crypto::CryptoError;
use idp_storage::StorageError;

use crate::keyring::KeyringError;

/// Result type for OIDC operations.
pub type OidcResult<T> = Result<T, OidcError>;

/// OAuth2 / OIDC protocol errors.
#[derive(Debug, Error)]
pub enum OidcError {
    /// Malformed request parameters or missing required fields.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed or the client is unknown/inactive.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Expired, revoked, or mismatched code or token.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Grant type outside the allow-list.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Requested scope is unknown.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// Response type other than `code`.
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),

    /// Consent denied, or a bad/missing bearer token or signature.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Bearer token lacks a scope the endpoint requires.
    #[error("insufficient_scope: {0}")]
    InsufficientScope(String),

    /// Unexpected internal failure.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl OidcError {
    /// Returns the OAuth2 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::AccessDenied(_) => "access_denied",
            Self::InsufficientScope(_) => "insufficient_scope",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidGrant(_)
            | Self::UnsupportedGrantType(_)
            | Self::InvalidScope(_)
            | Self::UnsupportedResponseType(_) => 400,
            Self::InvalidClient(_) => 401,
            Self::AccessDenied(_) | Self::InsufficientScope(_) => 403,
            Self::ServerError(_) => 500,
        }
    }

    /// Builds the JSON error body.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.to_string()),
        }
    }
}

impl From<StorageError> for OidcError {
    fn from(err: StorageError) -> Self {
        Self::ServerError(format!("storage: {err}"))
    }
}

impl From<CryptoError> for OidcError {
    fn from(err: CryptoError) -> Self {
        Self::ServerError(format!("crypto: {err}"))
    }
}

impl From<KeyringError> for OidcError {
    fn from(err: KeyringError) -> Self {
        match err {
            KeyringError::Storage(e) => e.into(),
            KeyringError::Crypto(e) => e.into(),
        }
    }
}

/// OAuth2 error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}
