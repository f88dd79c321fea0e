//! Inbound SAML message parsing.
//!
//! Extracts the handful of fields the IdP acts on from AuthnRequest and
//! LogoutRequest documents. Extraction is attribute/element scanning over
//! the serialized form, tolerant of the common namespace prefixes.

use crate::error::{SamlError, SamlResult};

/// The fields of an AuthnRequest this IdP consumes.
#[derive(Debug, Clone)]
pub struct ParsedAuthnRequest {
    /// Request ID, echoed as `InResponseTo`.
    pub id: String,

    /// The SP's entity id.
    pub issuer: String,

    /// Requested Assertion Consumer Service URL, if the SP sent one; the
    /// registration's configured ACS URL applies otherwise.
    pub acs_url: Option<String>,
}

/// The fields of a LogoutRequest this IdP consumes.
#[derive(Debug, Clone)]
pub struct ParsedLogoutRequest {
    /// Request ID, echoed as `InResponseTo`.
    pub id: String,

    /// The SP's entity id.
    pub issuer: String,

    /// NameID of the principal being logged out.
    pub name_id: Option<String>,

    /// Explicit response target from the request's `Destination`
    /// attribute.
    pub destination: Option<String>,
}

/// Parses an AuthnRequest document.
///
/// # Errors
///
/// Returns an error if the request ID or issuer is missing.
pub fn parse_authn_request(xml: &str) -> SamlResult<ParsedAuthnRequest> {
    let id = extract_attribute(xml, "AuthnRequest", "ID")
        .ok_or_else(|| SamlError::MissingElement("AuthnRequest ID".to_string()))?;

    let issuer = extract_element_content(xml, "Issuer")
        .ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?;

    let acs_url = extract_attribute(xml, "AuthnRequest", "AssertionConsumerServiceURL");

    Ok(ParsedAuthnRequest {
        id,
        issuer,
        acs_url,
    })
}

/// Parses a LogoutRequest document.
///
/// # Errors
///
/// Returns an error if the request ID or issuer is missing.
pub fn parse_logout_request(xml: &str) -> SamlResult<ParsedLogoutRequest> {
    let id = extract_attribute(xml, "LogoutRequest", "ID")
        .ok_or_else(|| SamlError::MissingElement("LogoutRequest ID".to_string()))?;

    let issuer = extract_element_content(xml, "Issuer")
        .ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?;

    Ok(ParsedLogoutRequest {
        id,
        issuer,
        name_id: extract_element_content(xml, "NameID"),
        destination: extract_attribute(xml, "LogoutRequest", "Destination"),
    })
}

/// Extracts an attribute value from the named element.
pub(crate) fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    for prefix in ["samlp:", "saml2p:", ""] {
        let pattern = format!("<{prefix}{element}");
        let Some(pos) = xml.find(&pattern) else {
            continue;
        };
        if !boundary_follows(xml, pos + pattern.len()) {
            continue;
        }

        let end = xml[pos..].find('>')?;
        let element_str = &xml[pos..pos + end];

        let attr_pattern = format!("{attribute}=\"");
        let attr_start = element_str.find(&attr_pattern)? + attr_pattern.len();
        let attr_end = element_str[attr_start..].find('"')?;
        let value = &element_str[attr_start..attr_start + attr_end];
        return (!value.is_empty()).then(|| value.to_string());
    }
    None
}

/// Extracts the text content of the named element.
pub(crate) fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    for prefix in ["saml:", "saml2:", ""] {
        let open = format!("<{prefix}{element}");
        let Some(pos) = xml.find(&open) else {
            continue;
        };
        if !boundary_follows(xml, pos + open.len()) {
            continue;
        }

        let content_start = pos + xml[pos..].find('>')? + 1;
        let close = format!("</{prefix}{element}>");
        let end = xml[content_start..].find(&close)?;
        return Some(xml[content_start..content_start + end].trim().to_string());
    }
    None
}

/// Whether the character at `pos` terminates an element name.
fn boundary_follows(xml: &str, pos: usize) -> bool {
    matches!(
        xml.as_bytes().get(pos),
        Some(b'>' | b' ' | b'\t' | b'\r' | b'\n' | b'/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHN_REQUEST: &str = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"
    xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"
    ID="_req123" Version="2.0" IssueInstant="2026-01-10T12:00:00Z"
    AssertionConsumerServiceURL="https://sp.example.com/acs">
    <saml:Issuer>https://sp.example.com</saml:Issuer>
    <samlp:NameIDPolicy Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent"/>
</samlp:AuthnRequest>"#;

    #[test]
    fn parses_authn_request() {
        let parsed = parse_authn_request(AUTHN_REQUEST).unwrap();
        assert_eq!(parsed.id, "_req123");
        assert_eq!(parsed.issuer, "https://sp.example.com");
        assert_eq!(parsed.acs_url.as_deref(), Some("https://sp.example.com/acs"));
    }

    #[test]
    fn acs_url_is_optional() {
        let xml = r#"<samlp:AuthnRequest ID="_r1">
            <saml:Issuer>https://sp.example.com</saml:Issuer>
        </samlp:AuthnRequest>"#;
        let parsed = parse_authn_request(xml).unwrap();
        assert!(parsed.acs_url.is_none());
    }

    #[test]
    fn missing_id_is_an_error() {
        let xml = r#"<samlp:AuthnRequest Version="2.0">
            <saml:Issuer>https://sp.example.com</saml:Issuer>
        </samlp:AuthnRequest>"#;
        assert!(matches!(
            parse_authn_request(xml),
            Err(SamlError::MissingElement(_))
        ));
    }

    #[test]
    fn parses_logout_request() {
        let xml = r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"
            ID="_lr1" Destination="https://sp.example.com/slo">
            <saml:Issuer>https://sp.example.com</saml:Issuer>
            <saml:NameID Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">42</saml:NameID>
        </samlp:LogoutRequest>"#;

        let parsed = parse_logout_request(xml).unwrap();
        assert_eq!(parsed.id, "_lr1");
        assert_eq!(parsed.issuer, "https://sp.example.com");
        assert_eq!(parsed.name_id.as_deref(), Some("42"));
        assert_eq!(
            parsed.destination.as_deref(),
            Some("https://sp.example.com/slo")
        );
    }

    #[test]
    fn unprefixed_elements_are_accepted() {
        let xml = r#"<AuthnRequest ID="_r2"><Issuer>https://sp.example.com</Issuer></AuthnRequest>"#;
        let parsed = parse_authn_request(xml).unwrap();
        assert_eq!(parsed.id, "_r2");
        assert_eq!(parsed.issuer, "https://sp.example.com");
    }
}
