//! SAML metadata: IdP descriptor emission and SP metadata parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::constants::{BINDING_HTTP_POST, BINDING_HTTP_REDIRECT, MD_NS, XMLDSIG_NS};
use crate::error::{SamlError, SamlResult};
use crate::response::xml_escape;

/// Renders the IdP `EntityDescriptor` for one registered service
/// provider: its dedicated signing certificate, the configured NameID
/// format, and the SSO/SLO endpoints in both bindings.
#[must_use]
pub fn idp_metadata_xml(
    idp_entity_id: &str,
    sso_url: &str,
    slo_url: &str,
    certificate_b64: &str,
    name_id_format: &str,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{MD_NS}"
                     xmlns:ds="{XMLDSIG_NS}"
                     entityID="{entity_id}">
    <md:IDPSSODescriptor WantAuthnRequestsSigned="false"
                         protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo>
                <ds:X509Data>
                    <ds:X509Certificate>{certificate}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
        <md:NameIDFormat>{name_id_format}</md:NameIDFormat>
        <md:SingleSignOnService Binding="{BINDING_HTTP_POST}"
                                Location="{sso_url}"/>
        <md:SingleSignOnService Binding="{BINDING_HTTP_REDIRECT}"
                                Location="{sso_url}"/>
        <md:SingleLogoutService Binding="{BINDING_HTTP_POST}"
                                Location="{slo_url}"/>
        <md:SingleLogoutService Binding="{BINDING_HTTP_REDIRECT}"
                                Location="{slo_url}"/>
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        entity_id = xml_escape(idp_entity_id),
        certificate = certificate_b64,
        name_id_format = xml_escape(name_id_format),
        sso_url = xml_escape(sso_url),
        slo_url = xml_escape(slo_url),
    )
}

/// What SP metadata yields for pre-filling a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpMetadata {
    /// SP entity id.
    pub entity_id: Option<String>,

    /// POST-binding Assertion Consumer Service URL.
    pub acs_url: Option<String>,

    /// Single Logout URL (POST preferred, Redirect fallback).
    pub slo_url: Option<String>,

    /// Signing certificate, base64 DER (`use="signing"` preferred, any
    /// key descriptor as fallback).
    pub certificate: Option<String>,

    /// First advertised NameID format.
    pub name_id_format: Option<String>,
}

/// Parses a fetched SP metadata document.
///
/// # Errors
///
/// Returns an error when the document is not well-formed XML.
pub fn parse_sp_metadata(xml: &str) -> SamlResult<SpMetadata> {
    let mut reader = Reader::from_str(xml);
    let mut metadata = SpMetadata::default();

    let mut slo_post: Option<String> = None;
    let mut slo_redirect: Option<String> = None;
    let mut signing_certificate: Option<String> = None;
    let mut fallback_certificate: Option<String> = None;

    let mut key_use: Option<String> = None;
    let mut in_certificate = false;
    let mut in_name_id_format = false;
    let mut certificate_text = String::new();
    let mut name_id_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"EntityDescriptor" => {
                        if let Ok(Some(attr)) = e.try_get_attribute("entityID") {
                            metadata.entity_id = attr
                                .unescape_value()
                                .ok()
                                .map(|v| v.into_owned())
                                .filter(|v| !v.is_empty());
                        }
                    }
                    b"KeyDescriptor" => {
                        key_use = e
                            .try_get_attribute("use")
                            .ok()
                            .flatten()
                            .and_then(|a| a.unescape_value().ok())
                            .map(|v| v.into_owned());
                    }
                    b"X509Certificate" => {
                        in_certificate = true;
                        certificate_text.clear();
                    }
                    b"NameIDFormat" => {
                        in_name_id_format = true;
                        name_id_text.clear();
                    }
                    b"AssertionConsumerService" => {
                        let binding = attribute_value(e, "Binding");
                        if binding.as_deref() == Some(BINDING_HTTP_POST)
                            && metadata.acs_url.is_none()
                        {
                            metadata.acs_url = attribute_value(e, "Location");
                        }
                    }
                    b"SingleLogoutService" => {
                        let binding = attribute_value(e, "Binding");
                        let location = attribute_value(e, "Location");
                        match binding.as_deref() {
                            Some(BINDING_HTTP_POST) if slo_post.is_none() => slo_post = location,
                            Some(BINDING_HTTP_REDIRECT) if slo_redirect.is_none() => {
                                slo_redirect = location;
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                if in_certificate || in_name_id_format {
                    let text = t
                        .unescape()
                        .map_err(|e| SamlError::InvalidRequest(format!("metadata XML: {e}")))?;
                    if in_certificate {
                        certificate_text.push_str(&text);
                    } else {
                        name_id_text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"X509Certificate" => {
                    in_certificate = false;
                    let cert: String = certificate_text
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect();
                    if !cert.is_empty() {
                        if key_use.as_deref() == Some("signing") {
                            signing_certificate.get_or_insert(cert);
                        } else {
                            fallback_certificate.get_or_insert(cert);
                        }
                    }
                }
                b"NameIDFormat" => {
                    in_name_id_format = false;
                    let format = name_id_text.trim().to_string();
                    if !format.is_empty() && metadata.name_id_format.is_none() {
                        metadata.name_id_format = Some(format);
                    }
                }
                b"KeyDescriptor" => key_use = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SamlError::InvalidRequest(format!("metadata XML: {e}")));
            }
        }
    }

    metadata.slo_url = slo_post.or(slo_redirect);
    metadata.certificate = signing_certificate.or(fallback_certificate);

    Ok(metadata)
}

fn attribute_value(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SP_METADATA: &str = r#"<?xml version="1.0"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"
                     xmlns:ds="http://www.w3.org/2000/09/xmldsig#"
                     entityID="https://sp.example.com/saml">
    <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo><ds:X509Data><ds:X509Certificate>
                MIIBsigningCERT
            </ds:X509Certificate></ds:X509Data></ds:KeyInfo>
        </md:KeyDescriptor>
        <md:KeyDescriptor use="encryption">
            <ds:KeyInfo><ds:X509Data><ds:X509Certificate>MIIBencCERT</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
        </md:KeyDescriptor>
        <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat>
        <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect"
                                Location="https://sp.example.com/slo-redirect"/>
        <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
                                Location="https://sp.example.com/slo-post"/>
        <md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
                                     Location="https://sp.example.com/acs" index="0"/>
    </md:SPSSODescriptor>
</md:EntityDescriptor>"#;

    #[test]
    fn parses_sp_metadata() {
        let metadata = parse_sp_metadata(SP_METADATA).unwrap();

        assert_eq!(
            metadata.entity_id.as_deref(),
            Some("https://sp.example.com/saml")
        );
        assert_eq!(metadata.acs_url.as_deref(), Some("https://sp.example.com/acs"));
        // POST binding wins over Redirect even when listed second.
        assert_eq!(
            metadata.slo_url.as_deref(),
            Some("https://sp.example.com/slo-post")
        );
        // The signing certificate wins over the encryption one, with
        // embedded whitespace stripped.
        assert_eq!(metadata.certificate.as_deref(), Some("MIIBsigningCERT"));
        assert_eq!(
            metadata.name_id_format.as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:nameid-format:persistent")
        );
    }

    #[test]
    fn malformed_metadata_is_rejected() {
        assert!(parse_sp_metadata("<md:EntityDescriptor><a></b></md:EntityDescriptor>").is_err());
    }

    #[test]
    fn idp_descriptor_shape() {
        let xml = idp_metadata_xml(
            "https://idp.example.com/saml/idp",
            "https://idp.example.com/saml/1/sso",
            "https://idp.example.com/saml/1/slo",
            "MIIBcert",
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
        );

        assert!(xml.contains(r#"entityID="https://idp.example.com/saml/idp""#));
        assert!(xml.contains("<ds:X509Certificate>MIIBcert</ds:X509Certificate>"));
        assert!(xml.contains(r#"Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST""#));
        assert!(xml.contains(r#"Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect""#));
        assert!(xml.contains("https://idp.example.com/saml/1/slo"));

        // The emitted descriptor parses back with our own SP parser's
        // machinery (shared element names).
        let parsed = parse_sp_metadata(&xml).unwrap();
        assert_eq!(
            parsed.entity_id.as_deref(),
            Some("https://idp.example.com/saml/idp")
        );
    }
}
