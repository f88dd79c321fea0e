//! Authorization and consent endpoint handlers.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use idp_model::Scope;

use super::{error_response, html_escape, principal, OidcState};
use crate::authorize::{AuthorizationRequest, AuthorizeOutcome};

/// `GET /oauth2/authorize`
///
/// Validates the request and either redirects straight back to the relying
/// party (skip-consent clients and protocol errors) or renders the consent
/// prompt.
pub async fn authorize_get(
    State(state): State<OidcState>,
    headers: HeaderMap,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    let user_id = match principal(&state, &headers).await {
        Ok(user_id) => user_id,
        Err(ref err) => return error_response(err),
    };

    match state.authorizer.begin(&request, user_id).await {
        Ok(AuthorizeOutcome::Redirect(url)) => Redirect::to(&url).into_response(),
        Ok(AuthorizeOutcome::ConsentRequired {
            consent_token,
            client_name,
            scopes,
        }) => Html(consent_page(&consent_token, &client_name, &scopes)).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// Form body of the consent decision.
#[derive(Debug, Deserialize)]
pub struct ApprovalForm {
    /// Token identifying the pending authorization.
    pub consent_token: String,

    /// `1` to approve, anything else to deny.
    pub approve: String,
}

/// `POST /oauth2/authorize`
///
/// Resumes a pending authorization with the user's consent decision.
pub async fn approve_post(
    State(state): State<OidcState>,
    headers: HeaderMap,
    Form(form): Form<ApprovalForm>,
) -> Response {
    let user_id = match principal(&state, &headers).await {
        Ok(user_id) => user_id,
        Err(ref err) => return error_response(err),
    };

    let approved = form.approve == "1";
    match state
        .authorizer
        .decide(&form.consent_token, user_id, approved)
        .await
    {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// Renders the minimal consent prompt.
///
/// The host application is expected to skin this; the form only needs to
/// POST `consent_token` and `approve` back to the same path.
fn consent_page(consent_token: &str, client_name: &str, scopes: &[Scope]) -> String {
    let scope_items: String = scopes
        .iter()
        .map(|s| format!("        <li>{}</li>\n", html_escape(s.as_str())))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Authorize {name}</title>
</head>
<body>
    <h1>Authorize {name}</h1>
    <p>{name} is requesting access to:</p>
    <ul>
{scopes}    </ul>
    <form method="post">
        <input type="hidden" name="consent_token" value="{token}"/>
        <button type="submit" name="approve" value="1">Approve</button>
        <button type="submit" name="approve" value="0">Deny</button>
    </form>
</body>
</html>"#,
        name = html_escape(client_name),
        scopes = scope_items,
        token = html_escape(consent_token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_page_escapes_client_name() {
        let page = consent_page("tok", "<evil>", &[Scope::OpenId]);
        assert!(!page.contains("<evil>"));
        assert!(page.contains("&lt;evil&gt;"));
        assert!(page.contains("name=\"consent_token\" value=\"tok\""));
        assert!(page.contains("<li>openid</li>"));
    }
}
