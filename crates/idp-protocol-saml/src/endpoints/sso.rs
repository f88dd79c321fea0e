//! Single sign-on endpoint.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use chrono::Utc;
use serde::Deserialize;

use idp_model::{IdentityClaims, SamlServiceProvider};

use super::state::SamlState;
use super::{error_response, principal};
use crate::bindings::{decode_message, render_post_binding, Binding};
use crate::constants::NameIdFormat;
use crate::error::{SamlError, SamlResult};
use crate::request::parse_authn_request;
use crate::response::build_sso_response;
use crate::signature::{build_signed_query, sign_enveloped, verify_redirect_signature};

/// Inbound SAML message parameters, shared by both bindings and both
/// flows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SamlMessageParams {
    /// The encoded SAML message.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,

    /// Opaque SP state, passed through unchanged.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,

    /// Detached signature (Redirect binding).
    #[serde(rename = "Signature")]
    pub signature: Option<String>,

    /// Signature algorithm URI (Redirect binding).
    #[serde(rename = "SigAlg")]
    pub sig_alg: Option<String>,
}

/// A response ready for delivery to the SP's endpoint via form POST.
#[derive(Debug)]
pub struct SamlDelivery {
    /// Where the form posts to.
    pub destination: String,

    /// Base64 of the signed response document.
    pub saml_response: String,

    /// RelayState to carry along, unchanged.
    pub relay_state: Option<String>,
}

impl SamlDelivery {
    /// Renders the auto-submitting form page.
    #[must_use]
    pub fn into_html(self) -> String {
        render_post_binding(
            &self.destination,
            &self.saml_response,
            self.relay_state.as_deref(),
        )
    }
}

/// `GET /saml/{application}/sso` (HTTP-Redirect binding).
pub async fn sso_get(
    State(state): State<SamlState>,
    Path(application_id): Path<i64>,
    headers: HeaderMap,
    Query(params): Query<SamlMessageParams>,
) -> Response {
    handle_sso(&state, application_id, &headers, &params, Binding::Redirect).await
}

/// `POST /saml/{application}/sso` (HTTP-POST binding).
pub async fn sso_post(
    State(state): State<SamlState>,
    Path(application_id): Path<i64>,
    headers: HeaderMap,
    Form(params): Form<SamlMessageParams>,
) -> Response {
    handle_sso(&state, application_id, &headers, &params, Binding::Post).await
}

async fn handle_sso(
    state: &SamlState,
    application_id: i64,
    headers: &HeaderMap,
    params: &SamlMessageParams,
    binding: Binding,
) -> Response {
    let user_id = match principal(state, headers).await {
        Ok(user_id) => user_id,
        Err(ref err) => return error_response(err),
    };

    match process_sso(state, application_id, params, binding, user_id).await {
        Ok(delivery) => Html(delivery.into_html()).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// Runs the SSO flow for an authenticated principal and returns the
/// signed response ready for POST delivery.
///
/// # Errors
///
/// Fails with 403 for inactive service providers before any request
/// parsing, and with protocol errors for undecodable or badly signed
/// requests.
pub async fn process_sso(
    state: &SamlState,
    application_id: i64,
    params: &SamlMessageParams,
    binding: Binding,
    user_id: i64,
) -> SamlResult<SamlDelivery> {
    let application = load_active_application(state, application_id).await?;

    let saml_request = params
        .saml_request
        .as_deref()
        .ok_or_else(|| SamlError::InvalidRequest("missing SAMLRequest parameter".to_string()))?;

    let xml = decode_message(saml_request, binding)?;

    verify_inbound_signature(&application, params, binding, saml_request)?;

    let request = parse_authn_request(&xml)?;

    let user = state
        .directory
        .get_user(user_id)
        .await?
        .ok_or(SamlError::AuthenticationRequired)?;
    let claims = IdentityClaims::for_user(&user, &state.site_domain);

    // Prefer the ACS URL named in the request; fall back to the
    // registration.
    let destination = request
        .acs_url
        .clone()
        .unwrap_or_else(|| application.acs_url.clone());

    let built = build_sso_response(
        &state.idp_entity_id,
        &application.entity_id,
        NameIdFormat::from_uri(&application.name_id_format),
        &destination,
        &request,
        &claims,
        Utc::now(),
    );

    let signed = sign_enveloped(
        &built.xml,
        &built.reference_id,
        &application.idp_private_key_pem,
        &application.idp_certificate,
    )?;

    tracing::debug!(
        application = application.id,
        issuer = %request.issuer,
        "issuing SAML response"
    );

    Ok(SamlDelivery {
        destination,
        saml_response: crate::bindings::encode_message_post(&signed),
        relay_state: params.relay_state.clone(),
    })
}

/// Loads the registration, rejecting inactive service providers before
/// anything else happens.
pub(crate) async fn load_active_application(
    state: &SamlState,
    application_id: i64,
) -> SamlResult<SamlServiceProvider> {
    let application = state
        .applications
        .get_application(application_id)
        .await?
        .ok_or(SamlError::ApplicationNotFound(application_id))?;

    if !application.is_active {
        return Err(SamlError::ApplicationInactive);
    }

    Ok(application)
}

/// Validates the inbound request's signature when the SP has a
/// verification certificate registered.
///
/// Redirect binding: the detached signature over the reconstructed query
/// string is required and must verify. POST binding: embedded XML
/// signatures are not verified — a known gap carried from the original
/// deployment, logged so operators can see it.
pub(crate) fn verify_inbound_signature(
    application: &SamlServiceProvider,
    params: &SamlMessageParams,
    binding: Binding,
    saml_request: &str,
) -> SamlResult<()> {
    let Some(certificate) = application.certificate.as_deref() else {
        return Ok(());
    };

    match binding {
        Binding::Redirect => {
            let (Some(signature), Some(sig_alg)) =
                (params.signature.as_deref(), params.sig_alg.as_deref())
            else {
                return Err(SamlError::SignatureInvalid(
                    "request signature is required but missing".to_string(),
                ));
            };

            let signed_query =
                build_signed_query(saml_request, params.relay_state.as_deref(), sig_alg);
            verify_redirect_signature(&signed_query, signature, sig_alg, certificate)
        }
        Binding::Post => {
            tracing::warn!(
                application = application.id,
                "POST-binding request accepted without embedded signature verification"
            );
            Ok(())
        }
    }
}
