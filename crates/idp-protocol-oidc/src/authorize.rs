//! Authorization-code front channel.
//!
//! An authorization attempt moves Requested → PendingConsent →
//! Approved|Denied → Completed. Validation happens in two stages: until the
//! client and redirect URI check out, errors surface to the caller; after
//! that, protocol errors travel back to the relying party as standard
//! error redirects carrying the unmodified `state`.
//!
//! Pending consent state is an explicit, versioned struct stored
//! server-side under an opaque consent token — live protocol objects are
//! never serialized into the browser session.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use idp_model::{ClientApplication, CodeChallengeMethod, PendingAuthorization, Scope};
use idp_storage::{ClientStore, PendingAuthStore};

use crate::error::{OidcError, OidcResult};
use crate::token::TokenIssuer;

/// Parameters of a `GET /oauth2/authorize` request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be `code`.
    pub response_type: String,

    /// Requesting client.
    pub client_id: String,

    /// Redirect target; must exactly match a registered URI.
    pub redirect_uri: Option<String>,

    /// Requested scopes, space-separated.
    pub scope: Option<String>,

    /// Opaque RP state, echoed back unmodified.
    pub state: Option<String>,

    /// PKCE code challenge.
    pub code_challenge: Option<String>,

    /// PKCE challenge method: `S256` (default) or `plain`.
    pub code_challenge_method: Option<String>,
}

/// What the authorize endpoint should do next.
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// Send the browser to this URL (success or protocol error redirect).
    Redirect(String),

    /// Render the consent prompt and wait for the user's decision.
    ConsentRequired {
        /// Opaque token keying the stored pending authorization.
        consent_token: String,

        /// Client display name for the prompt.
        client_name: String,

        /// Scopes the user is being asked to grant.
        scopes: Vec<Scope>,
    },
}

/// Drives the authorization-code flow.
pub struct Authorizer {
    clients: Arc<dyn ClientStore>,
    pending: Arc<dyn PendingAuthStore>,
    issuer: Arc<TokenIssuer>,
}

impl Authorizer {
    /// Creates an authorizer.
    pub fn new(
        clients: Arc<dyn ClientStore>,
        pending: Arc<dyn PendingAuthStore>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            clients,
            pending,
            issuer,
        }
    }

    /// Validates an authorization request and either completes it (clients
    /// configured to skip consent), or parks it pending the user's consent
    /// decision.
    ///
    /// # Errors
    ///
    /// Returns an error only while the redirect URI is untrusted (unknown
    /// or inactive client, missing or unregistered redirect URI); every
    /// later failure becomes an error redirect.
    pub async fn begin(
        &self,
        request: &AuthorizationRequest,
        user_id: i64,
    ) -> OidcResult<AuthorizeOutcome> {
        let client = self
            .clients
            .get_client(&request.client_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| {
                OidcError::InvalidClient(format!("unknown client: {}", request.client_id))
            })?;

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("redirect_uri is required".to_string()))?;

        if !client.allows_redirect_uri(redirect_uri) {
            return Err(OidcError::InvalidRequest(
                "redirect_uri is not registered for this client".to_string(),
            ));
        }

        // The redirect URI is trusted from here on; report failures to the
        // relying party instead of the user.
        if request.response_type != "code" {
            return Ok(AuthorizeOutcome::Redirect(error_redirect(
                redirect_uri,
                &OidcError::UnsupportedResponseType(request.response_type.clone()),
                request.state.as_deref(),
            )));
        }

        let requested = match Scope::parse_list(request.scope.as_deref().unwrap_or_default()) {
            Ok(scopes) => scopes,
            Err(err) => {
                return Ok(AuthorizeOutcome::Redirect(error_redirect(
                    redirect_uri,
                    &OidcError::InvalidScope(err.to_string()),
                    request.state.as_deref(),
                )));
            }
        };

        let scopes = finalize_scopes(&client, &requested);

        let code_challenge_method = match (&request.code_challenge, &request.code_challenge_method)
        {
            (Some(_), None) => Some(CodeChallengeMethod::S256),
            (Some(_), Some(method)) => match method.as_str() {
                "S256" => Some(CodeChallengeMethod::S256),
                "plain" => Some(CodeChallengeMethod::Plain),
                other => {
                    return Ok(AuthorizeOutcome::Redirect(error_redirect(
                        redirect_uri,
                        &OidcError::InvalidRequest(format!(
                            "unsupported code_challenge_method: {other}"
                        )),
                        request.state.as_deref(),
                    )));
                }
            },
            (None, Some(_)) => {
                return Ok(AuthorizeOutcome::Redirect(error_redirect(
                    redirect_uri,
                    &OidcError::InvalidRequest(
                        "code_challenge_method requires code_challenge".to_string(),
                    ),
                    request.state.as_deref(),
                )));
            }
            (None, None) => None,
        };

        let pending = PendingAuthorization {
            version: PendingAuthorization::VERSION,
            client_id: client.client_id.clone(),
            scopes: scopes.clone(),
            redirect_uri: redirect_uri.to_string(),
            response_mode: "query".to_string(),
            state: request.state.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method,
            created_at: Utc::now(),
        };

        if client.skip_consent {
            let url = self.complete(&pending, user_id).await?;
            return Ok(AuthorizeOutcome::Redirect(url));
        }

        let consent_token = idp_crypto::generate_consent_token();
        self.pending.put_pending(&consent_token, pending).await?;

        tracing::debug!(client = %client.client_id, "authorization pending consent");

        Ok(AuthorizeOutcome::ConsentRequired {
            consent_token,
            client_name: client.name,
            scopes,
        })
    }

    /// Resumes a parked authorization with the user's consent decision and
    /// returns the redirect URL to send the browser to.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` when the consent token is unknown,
    /// already used, or expired.
    pub async fn decide(
        &self,
        consent_token: &str,
        user_id: i64,
        approved: bool,
    ) -> OidcResult<String> {
        let pending = self
            .pending
            .take_pending(consent_token)
            .await?
            .filter(|p| p.version == PendingAuthorization::VERSION)
            .ok_or_else(|| {
                OidcError::InvalidRequest("unknown or expired authorization request".to_string())
            })?;

        if !approved {
            tracing::debug!(client = %pending.client_id, "authorization denied by user");
            return Ok(error_redirect(
                &pending.redirect_uri,
                &OidcError::AccessDenied("the resource owner denied the request".to_string()),
                pending.state.as_deref(),
            ));
        }

        self.complete(&pending, user_id).await
    }

    /// Issues the authorization code and builds the success redirect.
    async fn complete(&self, pending: &PendingAuthorization, user_id: i64) -> OidcResult<String> {
        let code = self
            .issuer
            .issue_code(
                &pending.client_id,
                user_id,
                pending.scopes.clone(),
                pending.redirect_uri.clone(),
                pending.code_challenge.clone(),
                pending.code_challenge_method,
            )
            .await?;

        let mut params = vec![("code", code.id.clone())];
        if let Some(state) = &pending.state {
            params.push(("state", state.clone()));
        }

        Ok(append_query(&pending.redirect_uri, &params))
    }
}

/// Filters requested scopes down to the client's allowed set.
///
/// Excess scopes are silently dropped, not rejected; `openid` is re-added
/// whenever the client allows it so an ID token can always be issued.
#[must_use]
pub fn finalize_scopes(client: &ClientApplication, requested: &[Scope]) -> Vec<Scope> {
    let mut scopes: Vec<Scope> = requested
        .iter()
        .copied()
        .filter(|s| client.allowed_scopes.contains(s))
        .collect();

    if !scopes.contains(&Scope::OpenId) && client.allowed_scopes.contains(&Scope::OpenId) {
        scopes.push(Scope::OpenId);
    }

    scopes
}

/// Builds an RFC 6749 error redirect.
#[must_use]
pub fn error_redirect(redirect_uri: &str, error: &OidcError, state: Option<&str>) -> String {
    let mut params = vec![
        ("error", error.error_code().to_string()),
        ("error_description", error.to_string()),
    ];
    if let Some(state) = state {
        params.push(("state", state.to_string()));
    }
    append_query(redirect_uri, &params)
}

fn append_query(redirect_uri: &str, params: &[(&str, String)]) -> String {
    let encoded: String = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    format!("{redirect_uri}{separator}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_scopes(scopes: Vec<Scope>) -> ClientApplication {
        let (client, _) = ClientApplication::new(
            "Test App",
            vec!["https://rp.example.com/cb".to_string()],
            scopes,
        );
        client
    }

    #[test]
    fn finalize_drops_excess_scopes() {
        let client = client_with_scopes(vec![Scope::OpenId, Scope::Profile]);
        let granted = finalize_scopes(
            &client,
            &[Scope::OpenId, Scope::Profile, Scope::Squads],
        );
        assert_eq!(granted, vec![Scope::OpenId, Scope::Profile]);
    }

    #[test]
    fn finalize_readds_openid() {
        let client = client_with_scopes(vec![Scope::OpenId, Scope::Profile]);
        let granted = finalize_scopes(&client, &[Scope::Profile]);
        assert!(granted.contains(&Scope::OpenId));
    }

    #[test]
    fn error_redirect_carries_state() {
        let url = error_redirect(
            "https://rp.example.com/cb",
            &OidcError::AccessDenied("denied".to_string()),
            Some("abc123"),
        );
        assert!(url.starts_with("https://rp.example.com/cb?error=access_denied"));
        assert!(url.contains("state=abc123"));
    }

    #[test]
    fn append_query_respects_existing_query() {
        let url = append_query(
            "https://rp.example.com/cb?keep=1",
            &[("code", "xyz".to_string())],
        );
        assert_eq!(url, "https://rp.example.com/cb?keep=1&code=xyz");
    }
}
