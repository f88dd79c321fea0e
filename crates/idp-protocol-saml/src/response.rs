//! SAML Response and LogoutResponse building.
//!
//! Documents are emitted directly in their final serialized form; the
//! signer digests these exact bytes, so nothing may reformat a document
//! after it is built.

use chrono::{DateTime, Duration, Utc};

use idp_model::{Claim, IdentityClaims};

use crate::constants::{
    NameIdFormat, ATTR_NAME_FORMAT_BASIC, AUTHN_CONTEXT_PASSWORD, CONFIRMATION_BEARER, SAMLP_NS,
    SAML_NS, STATUS_SUCCESS,
};
use crate::request::ParsedAuthnRequest;

/// Assertion validity window.
const ASSERTION_VALIDITY_MINUTES: i64 = 5;

/// Backdating applied to `NotBefore` to absorb clock skew.
const NOT_BEFORE_SKEW_SECONDS: i64 = 60;

/// Session length advertised in the AuthnStatement.
const SESSION_VALIDITY_MINUTES: i64 = 60;

/// A built (not yet signed) response document.
#[derive(Debug)]
pub struct BuiltResponse {
    /// The serialized XML.
    pub xml: String,

    /// The ID of the element a signature must reference.
    pub reference_id: String,
}

/// Derives the NameID value for the configured format.
///
/// Email format issues the synthetic email; persistent issues the
/// directory user id; transient issues a fresh random identifier per
/// response, not linkable across sessions; anything else issues the
/// display name.
#[must_use]
pub fn name_id_value(format: NameIdFormat, claims: &IdentityClaims) -> String {
    match format {
        NameIdFormat::Email => claim_string(claims, Claim::Email),
        NameIdFormat::Persistent => claim_string(claims, Claim::Sub),
        NameIdFormat::Transient => idp_crypto::random_hex(21),
        NameIdFormat::Unspecified => claim_string(claims, Claim::Name),
    }
}

/// Builds the success Response for an authentication request.
///
/// The assertion carries: bearer subject confirmation bound to the request
/// ID, a five-minute validity window backdated sixty seconds, the SP
/// entity id as audience, a one-hour session statement, and the attribute
/// statement of user id, synthetic email, main character name, squads,
/// character id, corporation id, and admin flag.
#[must_use]
pub fn build_sso_response(
    idp_entity_id: &str,
    sp_entity_id: &str,
    name_id_format: NameIdFormat,
    destination: &str,
    request: &ParsedAuthnRequest,
    claims: &IdentityClaims,
    now: DateTime<Utc>,
) -> BuiltResponse {
    let response_id = idp_crypto::generate_saml_id();
    let assertion_id = idp_crypto::generate_saml_id();

    let issue_instant = saml_instant(now);
    let not_before = saml_instant(now - Duration::seconds(NOT_BEFORE_SKEW_SECONDS));
    let not_on_or_after = saml_instant(now + Duration::minutes(ASSERTION_VALIDITY_MINUTES));
    let session_not_on_or_after = saml_instant(now + Duration::minutes(SESSION_VALIDITY_MINUTES));

    let name_id = xml_escape(&name_id_value(name_id_format, claims));

    let user_id = claim_string(claims, Claim::Sub);
    let email = xml_escape(&claim_string(claims, Claim::Email));
    let character_name = xml_escape(&claim_string_or(claims, Claim::CharacterName, "Unknown"));
    let character_id = claim_string_or(claims, Claim::CharacterId, "0");
    let corporation_id = claim_string_or(claims, Claim::CorporationId, "0");
    let is_admin = claim_string_or(claims, Claim::IsAdmin, "false");

    let squad_values: String = claims
        .get(Claim::Squads)
        .and_then(|v| v.as_array())
        .map(|squads| {
            squads
                .iter()
                .filter_map(|s| s.as_str())
                .map(|s| {
                    format!(
                        "                <saml:AttributeValue>{}</saml:AttributeValue>\n",
                        xml_escape(s)
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let xml = format!(
        r#"<samlp:Response xmlns:samlp="{SAMLP_NS}"
                xmlns:saml="{SAML_NS}"
                ID="{response_id}"
                Version="2.0"
                IssueInstant="{issue_instant}"
                Destination="{destination}"
                InResponseTo="{in_response_to}">
    <saml:Issuer>{idp_entity_id}</saml:Issuer>
    <samlp:Status>
        <samlp:StatusCode Value="{STATUS_SUCCESS}"/>
    </samlp:Status>
    <saml:Assertion xmlns:saml="{SAML_NS}"
                    Version="2.0"
                    ID="{assertion_id}"
                    IssueInstant="{issue_instant}">
        <saml:Issuer>{idp_entity_id}</saml:Issuer>
        <saml:Subject>
            <saml:NameID Format="{name_id_format_uri}">{name_id}</saml:NameID>
            <saml:SubjectConfirmation Method="{CONFIRMATION_BEARER}">
                <saml:SubjectConfirmationData NotOnOrAfter="{not_on_or_after}"
                                              Recipient="{destination}"
                                              InResponseTo="{in_response_to}"/>
            </saml:SubjectConfirmation>
        </saml:Subject>
        <saml:Conditions NotBefore="{not_before}" NotOnOrAfter="{not_on_or_after}">
            <saml:AudienceRestriction>
                <saml:Audience>{sp_entity_id}</saml:Audience>
            </saml:AudienceRestriction>
        </saml:Conditions>
        <saml:AuthnStatement AuthnInstant="{issue_instant}"
                             SessionNotOnOrAfter="{session_not_on_or_after}"
                             SessionIndex="{assertion_id}">
            <saml:AuthnContext>
                <saml:AuthnContextClassRef>{AUTHN_CONTEXT_PASSWORD}</saml:AuthnContextClassRef>
            </saml:AuthnContext>
        </saml:AuthnStatement>
        <saml:AttributeStatement>
            <saml:Attribute Name="user_id" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{user_id}</saml:AttributeValue>
            </saml:Attribute>
            <saml:Attribute Name="email" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{email}</saml:AttributeValue>
            </saml:Attribute>
            <saml:Attribute Name="name" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{character_name}</saml:AttributeValue>
            </saml:Attribute>
            <saml:Attribute Name="squads" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
{squad_values}            </saml:Attribute>
            <saml:Attribute Name="character_id" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{character_id}</saml:AttributeValue>
            </saml:Attribute>
            <saml:Attribute Name="corporation_id" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{corporation_id}</saml:AttributeValue>
            </saml:Attribute>
            <saml:Attribute Name="is_admin" NameFormat="{ATTR_NAME_FORMAT_BASIC}">
                <saml:AttributeValue>{is_admin}</saml:AttributeValue>
            </saml:Attribute>
        </saml:AttributeStatement>
    </saml:Assertion>
</samlp:Response>"#,
        name_id_format_uri = name_id_format.uri(),
        in_response_to = xml_escape(&request.id),
        destination = xml_escape(destination),
        idp_entity_id = xml_escape(idp_entity_id),
        sp_entity_id = xml_escape(sp_entity_id),
    );

    BuiltResponse {
        xml,
        reference_id: assertion_id,
    }
}

/// Builds a LogoutResponse: a status document with no assertion. The
/// signature references the document root.
#[must_use]
pub fn build_logout_response(
    idp_entity_id: &str,
    destination: &str,
    in_response_to: &str,
    now: DateTime<Utc>,
) -> BuiltResponse {
    let response_id = idp_crypto::generate_saml_id();

    let xml = format!(
        r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}"
                      xmlns:saml="{SAML_NS}"
                      ID="{response_id}"
                      Version="2.0"
                      IssueInstant="{issue_instant}"
                      Destination="{destination}"
                      InResponseTo="{in_response_to}">
    <saml:Issuer>{idp_entity_id}</saml:Issuer>
    <samlp:Status>
        <samlp:StatusCode Value="{STATUS_SUCCESS}"/>
    </samlp:Status>
</samlp:LogoutResponse>"#,
        issue_instant = saml_instant(now),
        destination = xml_escape(destination),
        in_response_to = xml_escape(in_response_to),
        idp_entity_id = xml_escape(idp_entity_id),
    );

    BuiltResponse {
        xml,
        reference_id: response_id,
    }
}

/// Formats a timestamp as a SAML instant (UTC, second precision).
fn saml_instant(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Escapes XML special characters in free-text values.
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn claim_string(claims: &IdentityClaims, claim: Claim) -> String {
    claim_string_or(claims, claim, "")
}

/// Renders a claim value as text, falling back when the source value is
/// null.
fn claim_string_or(claims: &IdentityClaims, claim: Claim, fallback: &str) -> String {
    match claims.get(claim) {
        Some(value) if value.is_null() => fallback.to_string(),
        Some(value) => match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        },
        None => fallback.to_string(),
    }
}
