//! Shared state for the OIDC endpoints.

use std::sync::Arc;

use idp_storage::{SessionProvider, UserDirectory};

use crate::authorize::Authorizer;
use crate::grants::GrantHandler;
use crate::guard::BearerValidator;
use crate::keyring::KeyManager;
use crate::token::TokenIssuer;

/// Everything the OIDC handlers need, wired once at startup.
#[derive(Clone)]
pub struct OidcState {
    /// Signing key lifecycle.
    pub keys: Arc<KeyManager>,

    /// Token issuance.
    pub issuer: Arc<TokenIssuer>,

    /// Authorization-code front channel.
    pub authorizer: Arc<Authorizer>,

    /// Token endpoint grants.
    pub grants: Arc<GrantHandler>,

    /// Bearer validation for protected endpoints.
    pub bearer: Arc<BearerValidator>,

    /// Host directory.
    pub directory: Arc<dyn UserDirectory>,

    /// Host browser sessions.
    pub sessions: Arc<dyn SessionProvider>,

    /// Name of the host application's session cookie.
    pub session_cookie: String,
}
