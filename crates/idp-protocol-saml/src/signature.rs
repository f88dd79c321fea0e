//! XML signing and signature verification.
//!
//! Outbound documents get an enveloped XML-DSig signature: exclusive C14N,
//! SHA-256 digest, RSA-SHA256 signature, with the signing certificate
//! embedded in `KeyInfo` and the `Signature` element inserted immediately
//! after the referenced element's `Issuer`. Documents are digested exactly
//! as serialized, so they must be emitted in canonical form and never
//! reformatted afterwards.
//!
//! Inbound redirect-binding requests are verified over the reconstructed
//! signed query string with the digest the `SigAlg` parameter implies.
//! POST-binding embedded signatures are not verified; see the endpoints
//! module for how that gap is surfaced.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};
use openssl::x509::{X509, X509NameBuilder};

use crate::constants::{
    signature_algorithms, DIGEST_SHA256, ENVELOPED_SIGNATURE, EXCLUSIVE_C14N,
};
use crate::error::{SamlError, SamlResult};

/// Certificate lifetime for per-application IdP credentials.
const CREDENTIAL_VALIDITY_DAYS: u32 = 3650;

/// A freshly generated per-application IdP signing credential.
///
/// Generated once when the service provider is registered; there is no
/// rotation path — re-creating the registration is the rotation.
#[derive(Debug, Clone)]
pub struct IdpCredential {
    /// Self-signed X.509 certificate, base64 DER without PEM headers.
    pub certificate: String,

    /// RSA private key, PKCS#8 PEM.
    pub private_key_pem: String,
}

/// Generates a self-signed RSA-2048/SHA-256 credential valid ten years.
///
/// # Errors
///
/// Returns an error if key or certificate generation fails.
pub fn generate_idp_credential(organization: &str) -> SamlResult<IdpCredential> {
    let rsa = Rsa::generate(2048)?;
    let pkey = PKey::from_rsa(rsa)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_nid(Nid::COMMONNAME, &format!("{organization} SAML IdP"))?;
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, organization)?;
    let name = name.build();

    let serial = BigNum::from_slice(&idp_crypto::random_bytes(16))?.to_asn1_integer()?;
    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(CREDENTIAL_VALIDITY_DAYS)?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&pkey)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    builder.sign(&pkey, MessageDigest::sha256())?;
    let certificate = builder.build();

    Ok(IdpCredential {
        certificate: STANDARD.encode(certificate.to_der()?),
        private_key_pem: String::from_utf8(pkey.private_key_to_pem_pkcs8()?)
            .map_err(|e| SamlError::Crypto(format!("key PEM is not UTF-8: {e}")))?,
    })
}

/// Applies an enveloped signature over the element carrying
/// `ID="{reference_id}"`, inserting the `Signature` element immediately
/// after that element's `Issuer`.
///
/// # Errors
///
/// Returns an error if the referenced element cannot be located or
/// signing fails.
pub fn sign_enveloped(
    xml: &str,
    reference_id: &str,
    private_key_pem: &str,
    certificate_b64: &str,
) -> SamlResult<String> {
    let element = locate_element(xml, reference_id)?;

    // The reference digest covers the element exactly as serialized,
    // before the signature is inserted (the enveloped transform excludes
    // the signature itself).
    let digest = idp_crypto::sha256(xml[element.start..element.end].as_bytes());
    let digest_b64 = STANDARD.encode(digest);

    let signed_info = build_signed_info(reference_id, &digest_b64);

    let pkey = PKey::private_key_from_pem(private_key_pem.as_bytes())?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
    signer.update(signed_info.as_bytes())?;
    let signature_b64 = STANDARD.encode(
        signer
            .sign_to_vec()
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?,
    );

    let signature_element = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">{signed_info}<ds:SignatureValue>{signature_b64}</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{certificate_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature>"#,
    );

    let mut signed = String::with_capacity(xml.len() + signature_element.len());
    signed.push_str(&xml[..element.signature_insert]);
    signed.push_str(&signature_element);
    signed.push_str(&xml[element.signature_insert..]);
    Ok(signed)
}

/// Reconstructs the query string a redirect-binding signature covers:
/// `SAMLRequest=<urlenc>[&RelayState=<urlenc>]&SigAlg=<urlenc>`.
#[must_use]
pub fn build_signed_query(
    saml_request: &str,
    relay_state: Option<&str>,
    sig_alg: &str,
) -> String {
    let mut query = format!("SAMLRequest={}", urlencoding::encode(saml_request));
    if let Some(rs) = relay_state {
        query.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
    }
    query.push_str(&format!("&SigAlg={}", urlencoding::encode(sig_alg)));
    query
}

/// Verifies a redirect-binding signature against the SP's certificate.
///
/// The digest is implied by `SigAlg` (SHA-1/256/384/512); unrecognized
/// algorithm URIs fall back to SHA-256. A failed verification is an error,
/// never a pass-through.
///
/// # Errors
///
/// Returns [`SamlError::SignatureInvalid`] when the signature does not
/// verify.
pub fn verify_redirect_signature(
    signed_query: &str,
    signature_b64: &str,
    sig_alg: &str,
    certificate_b64: &str,
) -> SamlResult<()> {
    let digest = match sig_alg {
        signature_algorithms::RSA_SHA1 => MessageDigest::sha1(),
        signature_algorithms::RSA_SHA384 => MessageDigest::sha384(),
        signature_algorithms::RSA_SHA512 => MessageDigest::sha512(),
        _ => MessageDigest::sha256(),
    };

    let certificate = decode_certificate(certificate_b64)?;
    let public_key = certificate.public_key()?;

    let signature = STANDARD
        .decode(signature_b64)
        .map_err(|e| SamlError::SignatureInvalid(format!("signature encoding: {e}")))?;

    let mut verifier = Verifier::new(digest, &public_key)?;
    verifier.update(signed_query.as_bytes())?;

    if verifier
        .verify(&signature)
        .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?
    {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid(
            "redirect binding signature does not verify".to_string(),
        ))
    }
}

/// Parses a base64 DER certificate as stored (whitespace tolerated).
pub(crate) fn decode_certificate(certificate_b64: &str) -> SamlResult<X509> {
    let cleaned: String = certificate_b64
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = STANDARD
        .decode(cleaned)
        .map_err(|e| SamlError::SignatureInvalid(format!("certificate encoding: {e}")))?;
    X509::from_der(&der).map_err(|e| SamlError::SignatureInvalid(format!("certificate: {e}")))
}

struct LocatedElement {
    start: usize,
    end: usize,
    signature_insert: usize,
}

/// Finds the element with the given ID, its extent, and where the
/// signature goes (after its `Issuer`).
fn locate_element(xml: &str, reference_id: &str) -> SamlResult<LocatedElement> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let attr_pos = xml.find(&id_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("element with ID '{reference_id}' not found"))
    })?;

    let start = xml[..attr_pos]
        .rfind('<')
        .ok_or_else(|| SamlError::SignatureCreation("malformed document".to_string()))?;

    let name_end = xml[start + 1..]
        .find(|c: char| c.is_whitespace() || c == '>')
        .map(|i| start + 1 + i)
        .ok_or_else(|| SamlError::SignatureCreation("malformed element".to_string()))?;
    let tag_name = &xml[start + 1..name_end];

    let close_tag = format!("</{tag_name}>");
    let end = xml[start..]
        .find(&close_tag)
        .map(|i| start + i + close_tag.len())
        .ok_or_else(|| {
            SamlError::SignatureCreation(format!("element '{tag_name}' is not closed"))
        })?;

    let open_end = xml[attr_pos..]
        .find('>')
        .map(|i| attr_pos + i + 1)
        .ok_or_else(|| SamlError::SignatureCreation("malformed element".to_string()))?;

    // The signature belongs right after the element's Issuer.
    let signature_insert = ["</saml:Issuer>", "</saml2:Issuer>", "</Issuer>"]
        .iter()
        .find_map(|pattern| {
            xml[open_end..end]
                .find(pattern)
                .map(|i| open_end + i + pattern.len())
        })
        .unwrap_or(open_end);

    Ok(LocatedElement {
        start,
        end,
        signature_insert,
    })
}

fn build_signed_info(reference_id: &str, digest_b64: &str) -> String {
    format!(
        r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:CanonicalizationMethod Algorithm="{EXCLUSIVE_C14N}"></ds:CanonicalizationMethod><ds:SignatureMethod Algorithm="{sig_alg}"></ds:SignatureMethod><ds:Reference URI="#{reference_id}"><ds:Transforms><ds:Transform Algorithm="{ENVELOPED_SIGNATURE}"></ds:Transform><ds:Transform Algorithm="{EXCLUSIVE_C14N}"></ds:Transform></ds:Transforms><ds:DigestMethod Algorithm="{DIGEST_SHA256}"></ds:DigestMethod><ds:DigestValue>{digest_b64}</ds:DigestValue></ds:Reference></ds:SignedInfo>"##,
        sig_alg = signature_algorithms::RSA_SHA256,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> String {
        r#"<samlp:Response ID="_resp1"><saml:Issuer>https://idp.example.com</saml:Issuer><saml:Assertion ID="_as1"><saml:Issuer>https://idp.example.com</saml:Issuer><saml:Subject>user</saml:Subject></saml:Assertion></samlp:Response>"#
            .to_string()
    }

    #[test]
    fn credential_generation_produces_parseable_cert() {
        let credential = generate_idp_credential("SeAT").unwrap();
        let cert = decode_certificate(&credential.certificate).unwrap();
        assert!(cert
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .is_some());
        assert!(credential.private_key_pem.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn enveloped_signature_lands_after_issuer() {
        let credential = generate_idp_credential("SeAT").unwrap();
        let signed = sign_enveloped(
            &sample_document(),
            "_as1",
            &credential.private_key_pem,
            &credential.certificate,
        )
        .unwrap();

        let issuer_end = signed
            .find(r#"<saml:Assertion ID="_as1"><saml:Issuer>https://idp.example.com</saml:Issuer>"#)
            .unwrap();
        let after_issuer = &signed[issuer_end..];
        // The signature immediately follows the assertion's Issuer.
        assert!(after_issuer.contains("</saml:Issuer><ds:Signature"));
        assert!(signed.contains("<ds:SignatureValue>"));
        assert!(signed.contains(&format!(
            "<ds:X509Certificate>{}</ds:X509Certificate>",
            credential.certificate
        )));
        assert!(signed.contains(r##"URI="#_as1""##));
    }

    #[test]
    fn digest_covers_the_unsigned_element() {
        let credential = generate_idp_credential("SeAT").unwrap();
        let xml = sample_document();
        let signed = sign_enveloped(&xml, "_as1", &credential.private_key_pem, &credential.certificate)
            .unwrap();

        // Recompute the expected digest over the pre-insertion element.
        let start = xml.find(r#"<saml:Assertion"#).unwrap();
        let end = xml.find("</saml:Assertion>").unwrap() + "</saml:Assertion>".len();
        let expected = STANDARD.encode(idp_crypto::sha256(xml[start..end].as_bytes()));

        assert!(signed.contains(&format!("<ds:DigestValue>{expected}</ds:DigestValue>")));
    }

    #[test]
    fn redirect_signature_roundtrip() {
        let credential = generate_idp_credential("SP Corp").unwrap();
        let query = build_signed_query(
            "fZJNb9swDIbv",
            Some("relay"),
            signature_algorithms::RSA_SHA256,
        );

        let pkey = PKey::private_key_from_pem(credential.private_key_pem.as_bytes()).unwrap();
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey).unwrap();
        signer.update(query.as_bytes()).unwrap();
        let signature = STANDARD.encode(signer.sign_to_vec().unwrap());

        verify_redirect_signature(
            &query,
            &signature,
            signature_algorithms::RSA_SHA256,
            &credential.certificate,
        )
        .unwrap();

        // Any tampering with the signed query breaks verification.
        let tampered = query.replace("relay", "other");
        assert!(matches!(
            verify_redirect_signature(
                &tampered,
                &signature,
                signature_algorithms::RSA_SHA256,
                &credential.certificate,
            ),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn unrecognized_sig_alg_defaults_to_sha256() {
        let credential = generate_idp_credential("SP Corp").unwrap();
        let query = build_signed_query("abc", None, "urn:example:unknown-alg");

        let pkey = PKey::private_key_from_pem(credential.private_key_pem.as_bytes()).unwrap();
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey).unwrap();
        signer.update(query.as_bytes()).unwrap();
        let signature = STANDARD.encode(signer.sign_to_vec().unwrap());

        verify_redirect_signature(&query, &signature, "urn:example:unknown-alg", &credential.certificate)
            .unwrap();
    }

    #[test]
    fn signed_query_shape() {
        let query = build_signed_query("a b", Some("r&s"), signature_algorithms::RSA_SHA256);
        assert!(query.starts_with("SAMLRequest=a%20b&RelayState=r%26s&SigAlg="));
    }
}
