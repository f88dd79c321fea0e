//! SAML error types.
//!
//! SAML-facing failures surface as plain HTTP aborts with a status and
//! message; no signed error responses are produced.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The targeted service provider registration does not exist.
    #[error("unknown SAML application: {0}")]
    ApplicationNotFound(i64),

    /// The service provider is deactivated; nothing is processed for it.
    #[error("SAML application is not active")]
    ApplicationInactive,

    /// Invalid inbound message format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A required element or attribute is missing.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Base64 decoding failed.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// DEFLATE decompression failed.
    #[error("failed to inflate message: {0}")]
    Deflate(String),

    /// Signature verification failed. Never downgraded to accepted.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Signing a response failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// No logout destination could be resolved.
    #[error("no single logout URL configured for this application")]
    MissingLogoutDestination,

    /// The request requires an authenticated host session.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::MissingElement(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::SignatureInvalid(_)
            | Self::MissingLogoutDestination => 400,
            Self::AuthenticationRequired => 401,
            Self::ApplicationInactive => 403,
            Self::ApplicationNotFound(_) => 404,
            Self::SignatureCreation(_) | Self::Crypto(_) | Self::Storage(_) => 500,
        }
    }
}

impl From<idp_storage::StorageError> for SamlError {
    fn from(err: idp_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<openssl::error::ErrorStack> for SamlError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Self::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses() {
        assert_eq!(SamlError::ApplicationInactive.http_status(), 403);
        assert_eq!(SamlError::ApplicationNotFound(7).http_status(), 404);
        assert_eq!(
            SamlError::SignatureInvalid("bad".to_string()).http_status(),
            400
        );
        assert_eq!(SamlError::MissingLogoutDestination.http_status(), 400);
        assert_eq!(SamlError::Crypto("boom".to_string()).http_status(), 500);
    }
}
