//! SAML binding transport.
//!
//! Inbound messages are base64 in both bindings; the HTTP-Redirect binding
//! additionally raw-DEFLATEs the XML (no zlib header). Outbound responses
//! always travel as an auto-submitting HTML form POST.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};

/// The binding an inbound message arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// HTTP-Redirect (GET): deflated, base64, query parameters.
    Redirect,

    /// HTTP-POST: plain base64 in the form body.
    Post,
}

/// Decodes an inbound `SAMLRequest` parameter into XML.
///
/// Base64-decodes always; raw-inflates only for the Redirect binding —
/// POST bodies are plain base64 XML.
///
/// # Errors
///
/// Returns an error if decoding, inflation, or UTF-8 conversion fails.
pub fn decode_message(encoded: &str, binding: Binding) -> SamlResult<String> {
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

    let xml_bytes = match binding {
        Binding::Redirect => inflate(&decoded)?,
        Binding::Post => decoded,
    };

    String::from_utf8(xml_bytes)
        .map_err(|e| SamlError::InvalidRequest(format!("message is not valid UTF-8: {e}")))
}

/// Encodes XML for the Redirect binding: raw DEFLATE, then base64.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn encode_message_redirect(xml: &str) -> SamlResult<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .map_err(|e| SamlError::Deflate(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SamlError::Deflate(e.to_string()))?;
    Ok(STANDARD.encode(compressed))
}

/// Encodes XML for the POST binding: plain base64.
#[must_use]
pub fn encode_message_post(xml: &str) -> String {
    STANDARD.encode(xml)
}

/// Renders the auto-submitting form that delivers a `SAMLResponse` to the
/// service provider, carrying `RelayState` unchanged if present.
#[must_use]
pub fn render_post_binding(
    destination: &str,
    saml_response: &str,
    relay_state: Option<&str>,
) -> String {
    let relay_state_input = relay_state
        .filter(|rs| !rs.is_empty())
        .map(|rs| {
            format!(
                r#"        <input type="hidden" name="RelayState" value="{}"/>
"#,
                html_escape(rs)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Redirecting...</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="SAMLResponse" value="{}"/>
{}        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
        html_escape(destination),
        html_escape(saml_response),
        relay_state_input
    )
}

fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SamlError::Deflate(e.to_string()))?;
    Ok(out)
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_binding_roundtrip() {
        let xml = r#"<samlp:AuthnRequest ID="_abc">content</samlp:AuthnRequest>"#;
        let encoded = encode_message_redirect(xml).unwrap();
        let decoded = decode_message(&encoded, Binding::Redirect).unwrap();
        assert_eq!(decoded, xml);
    }

    #[test]
    fn post_binding_roundtrip() {
        let xml = r#"<samlp:AuthnRequest ID="_abc">content</samlp:AuthnRequest>"#;
        let encoded = encode_message_post(xml);
        let decoded = decode_message(&encoded, Binding::Post).unwrap();
        assert_eq!(decoded, xml);
    }

    #[test]
    fn post_payload_is_not_inflated() {
        // A POST body run through the redirect decoder fails: it is not
        // DEFLATE data.
        let encoded = encode_message_post("<xml/>");
        assert!(matches!(
            decode_message(&encoded, Binding::Redirect),
            Err(SamlError::Deflate(_))
        ));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode_message("!!!not-base64!!!", Binding::Post),
            Err(SamlError::Base64Decode(_))
        ));
    }

    #[test]
    fn post_form_carries_relay_state_unchanged() {
        let html = render_post_binding("https://sp.example.com/acs", "c2FtbA==", Some("state-1"));
        assert!(html.contains(r#"action="https://sp.example.com/acs""#));
        assert!(html.contains(r#"name="SAMLResponse" value="c2FtbA==""#));
        assert!(html.contains(r#"name="RelayState" value="state-1""#));

        let without = render_post_binding("https://sp.example.com/acs", "c2FtbA==", None);
        assert!(!without.contains("RelayState"));
    }

    #[test]
    fn post_form_escapes_destination() {
        let html = render_post_binding("https://sp.example.com/acs?a=1&b=2", "x", None);
        assert!(html.contains("a=1&amp;b=2"));
    }
}
