//! End-to-end SAML SSO/SLO flow tests against the in-memory store.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;

use idp_model::{DirectoryUser, MainCharacter, SamlServiceProvider};
use idp_protocol_saml::bindings::{encode_message_post, encode_message_redirect};
use idp_protocol_saml::constants::{signature_algorithms, NameIdFormat};
use idp_protocol_saml::endpoints::{process_slo, process_sso, SamlMessageParams, SamlState};
use idp_protocol_saml::signature::{build_signed_query, generate_idp_credential};
use idp_protocol_saml::{Binding, SamlError};
use idp_storage::{MemoryStore, SamlApplicationStore};

const USER_ID: i64 = 42;

struct TestSaml {
    store: Arc<MemoryStore>,
    state: SamlState,
}

fn test_saml() -> TestSaml {
    let store = Arc::new(MemoryStore::new());

    let mut user = DirectoryUser::new(USER_ID, "pilot");
    user.admin = true;
    user.squads = vec!["logistics".to_string(), "recon".to_string()];
    user.main_character = Some(MainCharacter {
        character_id: 90_000_001,
        name: "Main Char".to_string(),
        corporation_id: 98_000_001,
        alliance_id: Some(99_000_001),
    });
    store.add_user(user);
    store.add_session("session-1", USER_ID);

    let state = SamlState {
        applications: store.clone(),
        directory: store.clone(),
        sessions: store.clone(),
        idp_entity_id: "https://seat.example.com/saml/idp".to_string(),
        base_url: "https://seat.example.com".to_string(),
        site_domain: "seat.example.com".to_string(),
        session_cookie: "seat_session".to_string(),
    };

    TestSaml { store, state }
}

fn register_application(saml: &TestSaml, name_id_format: NameIdFormat, active: bool) -> i64 {
    let credential = generate_idp_credential("SeAT").unwrap();
    saml.store.add_saml_application(SamlServiceProvider {
        id: 0,
        name: "wiki".to_string(),
        entity_id: "https://wiki.example.com/saml".to_string(),
        acs_url: "https://wiki.example.com/saml/acs".to_string(),
        slo_url: Some("https://wiki.example.com/saml/slo".to_string()),
        certificate: None,
        metadata_url: None,
        name_id_format: name_id_format.uri().to_string(),
        is_active: active,
        idp_certificate: credential.certificate,
        idp_private_key_pem: credential.private_key_pem,
        created_at: Utc::now(),
    })
}

fn authn_request_xml() -> String {
    r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_req1" Version="2.0" IssueInstant="2026-01-10T12:00:00Z" AssertionConsumerServiceURL="https://wiki.example.com/saml/acs"><saml:Issuer>https://wiki.example.com/saml</saml:Issuer></samlp:AuthnRequest>"#
        .to_string()
}

fn logout_request_xml(destination: Option<&str>) -> String {
    let destination_attr = destination
        .map(|d| format!(r#" Destination="{d}""#))
        .unwrap_or_default();
    format!(
        r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_lr1" Version="2.0"{destination_attr}><saml:Issuer>https://wiki.example.com/saml</saml:Issuer><saml:NameID>42</saml:NameID></samlp:LogoutRequest>"#
    )
}

fn redirect_params(xml: &str) -> SamlMessageParams {
    SamlMessageParams {
        saml_request: Some(encode_message_redirect(xml).unwrap()),
        relay_state: Some("relay-1".to_string()),
        signature: None,
        sig_alg: None,
    }
}

#[tokio::test]
async fn inactive_application_is_rejected_before_parsing() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, false);

    // Garbage request payload: rejection must happen before any decoding
    // or parsing is attempted.
    let params = SamlMessageParams {
        saml_request: Some("!!not even base64!!".to_string()),
        relay_state: None,
        signature: None,
        sig_alg: None,
    };

    let err = process_sso(&saml.state, app_id, &params, Binding::Redirect, USER_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::ApplicationInactive));
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn sso_produces_signed_response_with_attributes() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, true);

    let delivery = process_sso(
        &saml.state,
        app_id,
        &redirect_params(&authn_request_xml()),
        Binding::Redirect,
        USER_ID,
    )
    .await
    .unwrap();

    assert_eq!(delivery.destination, "https://wiki.example.com/saml/acs");
    assert_eq!(delivery.relay_state.as_deref(), Some("relay-1"));

    let xml = String::from_utf8(STANDARD.decode(&delivery.saml_response).unwrap()).unwrap();
    assert!(xml.contains(r#"InResponseTo="_req1""#));
    assert!(xml.contains("urn:oasis:names:tc:SAML:2.0:status:Success"));
    assert!(xml.contains("<ds:SignatureValue>"));
    assert!(xml.contains("<ds:X509Certificate>"));
    // Signature sits between the assertion's Issuer and the Subject.
    let sig_pos = xml.find("<ds:Signature").unwrap();
    assert!(sig_pos < xml.find("<saml:Subject>").unwrap());
    // Persistent NameID carries the user id.
    assert!(xml.contains(">42</saml:NameID>"));
    // Attribute statement reflects the directory record.
    assert!(xml.contains("<saml:AttributeValue>seatuser.42@seat.example.com</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>Main Char</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>logistics</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>recon</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>90000001</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>98000001</saml:AttributeValue>"));
    assert!(xml.contains("<saml:AttributeValue>true</saml:AttributeValue>"));
    assert!(xml.contains("<saml:Audience>https://wiki.example.com/saml</saml:Audience>"));
}

#[tokio::test]
async fn post_binding_accepts_plain_base64() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Unspecified, true);

    let params = SamlMessageParams {
        saml_request: Some(encode_message_post(&authn_request_xml())),
        relay_state: None,
        signature: None,
        sig_alg: None,
    };

    let delivery = process_sso(&saml.state, app_id, &params, Binding::Post, USER_ID)
        .await
        .unwrap();

    let xml = String::from_utf8(STANDARD.decode(&delivery.saml_response).unwrap()).unwrap();
    // Unspecified format issues the display name.
    assert!(xml.contains(">pilot</saml:NameID>"));
}

#[tokio::test]
async fn transient_name_id_differs_per_response() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Transient, true);
    let params = redirect_params(&authn_request_xml());

    let mut values = Vec::new();
    for _ in 0..2 {
        let delivery = process_sso(&saml.state, app_id, &params, Binding::Redirect, USER_ID)
            .await
            .unwrap();
        let xml = String::from_utf8(STANDARD.decode(&delivery.saml_response).unwrap()).unwrap();

        let open = xml.find("<saml:NameID").expect("NameID present");
        let close = xml[open..].find('>').unwrap() + open + 1;
        let end = xml[close..].find("</saml:NameID>").unwrap() + close;
        values.push(xml[close..end].to_string());
    }

    assert_ne!(values[0], values[1]);
}

#[tokio::test]
async fn signed_redirect_requests_are_verified() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, true);

    // Register an SP verification certificate.
    let sp_credential = generate_idp_credential("Wiki SP").unwrap();
    let mut app = saml
        .store
        .get_application(app_id)
        .await
        .unwrap()
        .unwrap();
    app.certificate = Some(sp_credential.certificate.clone());
    saml.store.update_application(app).await.unwrap();

    let encoded = encode_message_redirect(&authn_request_xml()).unwrap();
    let sig_alg = signature_algorithms::RSA_SHA256;
    let signed_query = build_signed_query(&encoded, Some("relay-1"), sig_alg);

    let pkey = PKey::private_key_from_pem(sp_credential.private_key_pem.as_bytes()).unwrap();
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey).unwrap();
    signer.update(signed_query.as_bytes()).unwrap();
    let signature = STANDARD.encode(signer.sign_to_vec().unwrap());

    let mut params = SamlMessageParams {
        saml_request: Some(encoded),
        relay_state: Some("relay-1".to_string()),
        signature: Some(signature),
        sig_alg: Some(sig_alg.to_string()),
    };

    // Unmodified request verifies and completes.
    process_sso(&saml.state, app_id, &params, Binding::Redirect, USER_ID)
        .await
        .unwrap();

    // Tampering with any signed parameter breaks verification.
    params.relay_state = Some("tampered".to_string());
    let err = process_sso(&saml.state, app_id, &params, Binding::Redirect, USER_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));

    // A missing signature is a failure, not a downgrade to unsigned.
    params.relay_state = Some("relay-1".to_string());
    params.signature = None;
    let err = process_sso(&saml.state, app_id, &params, Binding::Redirect, USER_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));
}

#[tokio::test]
async fn slo_signs_response_and_ends_session() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, true);

    let params = SamlMessageParams {
        saml_request: Some(encode_message_redirect(&logout_request_xml(None)).unwrap()),
        relay_state: None,
        signature: None,
        sig_alg: None,
    };

    let delivery = process_slo(
        &saml.state,
        app_id,
        &params,
        Binding::Redirect,
        Some("session-1"),
    )
    .await
    .unwrap();

    // No Destination in the request: the registration's SLO URL applies.
    assert_eq!(delivery.destination, "https://wiki.example.com/saml/slo");

    let xml = String::from_utf8(STANDARD.decode(&delivery.saml_response).unwrap()).unwrap();
    assert!(xml.contains("LogoutResponse"));
    assert!(xml.contains(r#"InResponseTo="_lr1""#));
    assert!(xml.contains("<ds:SignatureValue>"));
    assert!(!xml.contains("Assertion"));

    // The host session is gone.
    use idp_storage::SessionProvider;
    assert!(saml
        .store
        .user_for_session("session-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn slo_prefers_request_destination() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, true);

    let params = SamlMessageParams {
        saml_request: Some(
            encode_message_redirect(&logout_request_xml(Some("https://wiki.example.com/other")))
                .unwrap(),
        ),
        relay_state: None,
        signature: None,
        sig_alg: None,
    };

    let delivery = process_slo(&saml.state, app_id, &params, Binding::Redirect, None)
        .await
        .unwrap();
    assert_eq!(delivery.destination, "https://wiki.example.com/other");
}

#[tokio::test]
async fn slo_without_destination_is_a_hard_failure() {
    let saml = test_saml();
    let app_id = register_application(&saml, NameIdFormat::Persistent, true);

    // Strip the registration's SLO URL.
    let mut app = saml
        .store
        .get_application(app_id)
        .await
        .unwrap()
        .unwrap();
    app.slo_url = None;
    saml.store.update_application(app).await.unwrap();

    let params = SamlMessageParams {
        saml_request: Some(encode_message_redirect(&logout_request_xml(None)).unwrap()),
        relay_state: None,
        signature: None,
        sig_alg: None,
    };

    let err = process_slo(&saml.state, app_id, &params, Binding::Redirect, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::MissingLogoutDestination));
    assert_eq!(err.http_status(), 400);
}
