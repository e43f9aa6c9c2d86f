// Integration tests for `VerificationClient` using wiremock.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smartgate_api::transport::TransportConfig;
use smartgate_api::{AccessKind, AccessStatus, EndpointPaths, Error, VerificationClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, VerificationClient) {
    let server = MockServer::start().await;
    let base: Url = server.uri().parse().expect("mock server URI");
    let client = VerificationClient::new(
        &base,
        &EndpointPaths::default(),
        &TransportConfig::default(),
    )
    .expect("client");
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_general_access_granted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .and(body_json(json!({ "matricula": "ABC123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "PERMITIDO",
            "matricula": "ABC123",
            "mensaje": "Acceso autorizado"
        })))
        .mount(&server)
        .await;

    let decision = client.verify("ABC123", AccessKind::General).await.unwrap();

    assert!(decision.is_granted());
    assert_eq!(decision.status, Some(AccessStatus::Permitted));
    assert_eq!(decision.plate.as_deref(), Some("ABC123"));
    assert_eq!(decision.message.as_deref(), Some("Acceso autorizado"));
}

#[tokio::test]
async fn test_secured_access_granted_with_payment_info() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/cocheras/verificar-acceso"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "acceso": true,
            "mensaje": "Acceso autorizado",
            "dias_restantes": 12,
            "fecha_vencimiento": "2026-09-08"
        })))
        .mount(&server)
        .await;

    let decision = client.verify("XYZ789", AccessKind::Secured).await.unwrap();

    assert!(decision.is_granted());
    assert_eq!(decision.days_remaining, Some(12));
    assert_eq!(decision.due_date.as_deref(), Some("2026-09-08"));
}

#[tokio::test]
async fn test_denied_with_reason() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/cocheras/verificar-acceso"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "acceso": false,
            "mensaje": "Acceso denegado",
            "motivo": "Mensualidad vencida",
            "dias_restantes": -5,
            "fecha_vencimiento": "2026-08-22"
        })))
        .mount(&server)
        .await;

    let decision = client.verify("XYZ789", AccessKind::Secured).await.unwrap();

    assert!(!decision.is_granted());
    assert_eq!(decision.reason.as_deref(), Some("Mensualidad vencida"));
    assert_eq!(decision.days_remaining, Some(-5));
}

// ── Error-status handling ───────────────────────────────────────────

#[tokio::test]
async fn test_detail_error_body_maps_to_access_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "detail": "Acceso denegado" })),
        )
        .mount(&server)
        .await;

    let err = client
        .verify("BAD999", AccessKind::General)
        .await
        .unwrap_err();

    match err {
        Error::AccessApi { message, status } => {
            assert_eq!(message, "Acceso denegado");
            assert_eq!(status, 403);
        }
        other => panic!("expected AccessApi error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_structured_denial_under_error_status() {
    let (server, client) = setup().await;

    // The server sometimes delivers the full denial payload with a
    // non-2xx status; that is still a decision, not a transport fault.
    Mock::given(method("POST"))
        .and(path("/cocheras/verificar-acceso"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "acceso": false,
            "motivo": "Mensualidad vencida",
            "dias_restantes": -10
        })))
        .mount(&server)
        .await;

    let decision = client.verify("XYZ789", AccessKind::Secured).await.unwrap();

    assert!(!decision.is_granted());
    assert_eq!(decision.reason.as_deref(), Some("Mensualidad vencida"));
}

#[tokio::test]
async fn test_unstructured_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .verify("ABC123", AccessKind::General)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedStatus { status: 500 }));
}

#[tokio::test]
async fn test_success_status_with_garbage_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client
        .verify("ABC123", AccessKind::General)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Port 1 is never listening
    let base: Url = "http://127.0.0.1:1/".parse().expect("url");
    let client = VerificationClient::new(
        &base,
        &EndpointPaths::default(),
        &TransportConfig::default(),
    )
    .expect("client");

    let err = client
        .verify("ABC123", AccessKind::General)
        .await
        .unwrap_err();

    assert!(err.is_connectivity());
}
