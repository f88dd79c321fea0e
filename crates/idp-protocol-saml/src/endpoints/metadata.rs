//! IdP metadata endpoint.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use super::state::SamlState;
use super::{error_response, sso::load_active_application};
use crate::error::SamlResult;
use crate::metadata::idp_metadata_xml;

/// `GET /saml/applications/{id}/metadata`
///
/// Serves this IdP's `EntityDescriptor` for one registered service
/// provider, downloadable as an XML document.
pub async fn metadata_get(
    State(state): State<SamlState>,
    Path(application_id): Path<i64>,
) -> Response {
    match generate_metadata(&state, application_id).await {
        Ok(xml) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/xml".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"idp-metadata-{application_id}.xml\""),
                ),
            ],
            xml,
        )
            .into_response(),
        Err(ref err) => error_response(err),
    }
}

async fn generate_metadata(state: &SamlState, application_id: i64) -> SamlResult<String> {
    let application = load_active_application(state, application_id).await?;

    Ok(idp_metadata_xml(
        &state.idp_entity_id,
        &state.sso_url(application_id),
        &state.slo_url(application_id),
        &application.idp_certificate,
        &application.name_id_format,
    ))
}
