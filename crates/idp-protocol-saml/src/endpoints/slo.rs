//! Single logout endpoint.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use chrono::Utc;

use super::state::SamlState;
use super::sso::{
    load_active_application, verify_inbound_signature, SamlDelivery, SamlMessageParams,
};
use super::{error_response, session_cookie};
use crate::bindings::{decode_message, encode_message_post, Binding};
use crate::error::{SamlError, SamlResult};
use crate::request::parse_logout_request;
use crate::response::build_logout_response;
use crate::signature::sign_enveloped;

/// `GET /saml/{application}/slo` (HTTP-Redirect binding).
pub async fn slo_get(
    State(state): State<SamlState>,
    Path(application_id): Path<i64>,
    headers: HeaderMap,
    Query(params): Query<SamlMessageParams>,
) -> Response {
    handle_slo(&state, application_id, &headers, &params, Binding::Redirect).await
}

/// `POST /saml/{application}/slo` (HTTP-POST binding).
pub async fn slo_post(
    State(state): State<SamlState>,
    Path(application_id): Path<i64>,
    headers: HeaderMap,
    Form(params): Form<SamlMessageParams>,
) -> Response {
    handle_slo(&state, application_id, &headers, &params, Binding::Post).await
}

async fn handle_slo(
    state: &SamlState,
    application_id: i64,
    headers: &HeaderMap,
    params: &SamlMessageParams,
    binding: Binding,
) -> Response {
    let session = session_cookie(state, headers);

    match process_slo(state, application_id, params, binding, session.as_deref()).await {
        Ok(delivery) => Html(delivery.into_html()).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// Runs the SLO flow: validates the LogoutRequest, ends the local host
/// session, and returns the signed LogoutResponse for POST delivery.
///
/// Resolving no destination — the request names none and the registration
/// has no SLO URL — is a hard failure, not a silent no-op.
///
/// # Errors
///
/// Fails with 403 for inactive service providers before any request
/// parsing, 400 when no destination resolves, and protocol errors for
/// undecodable or badly signed requests.
pub async fn process_slo(
    state: &SamlState,
    application_id: i64,
    params: &SamlMessageParams,
    binding: Binding,
    session: Option<&str>,
) -> SamlResult<SamlDelivery> {
    let application = load_active_application(state, application_id).await?;

    let saml_request = params
        .saml_request
        .as_deref()
        .ok_or_else(|| SamlError::InvalidRequest("missing SAMLRequest parameter".to_string()))?;

    let xml = decode_message(saml_request, binding)?;

    verify_inbound_signature(&application, params, binding, saml_request)?;

    let request = parse_logout_request(&xml)?;

    // End the local session; logout proceeds even if the browser carried
    // no session (the SP is telling us the user is gone either way).
    if let Some(session) = session {
        state.sessions.end_session(session).await?;
    }

    let destination = application
        .logout_destination(request.destination.as_deref())
        .ok_or(SamlError::MissingLogoutDestination)?
        .to_string();

    let built = build_logout_response(&state.idp_entity_id, &destination, &request.id, Utc::now());

    let signed = sign_enveloped(
        &built.xml,
        &built.reference_id,
        &application.idp_private_key_pem,
        &application.idp_certificate,
    )?;

    tracing::debug!(
        application = application.id,
        issuer = %request.issuer,
        name_id = request.name_id.as_deref().unwrap_or(""),
        "issuing SAML logout response"
    );

    Ok(SamlDelivery {
        destination,
        saml_response: encode_message_post(&signed),
        relay_state: params.relay_state.clone(),
    })
}
