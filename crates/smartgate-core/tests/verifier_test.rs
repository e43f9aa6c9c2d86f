// Integration tests for the Verifier against a mock access server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smartgate_core::{AccessKind, CoreError, VerificationOutcome, Verifier, VerifierConfig};

fn verifier_for(uri: &str) -> Verifier {
    let config = VerifierConfig::new(Url::parse(uri).unwrap());
    Verifier::new(&config).unwrap()
}

#[tokio::test]
async fn granted_check_publishes_the_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .and(body_json(serde_json::json!({ "matricula": "ABC123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "acceso": true,
            "mensaje": "Acceso autorizado"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = verifier_for(&server.uri());
    let mut latest = verifier.latest();

    // Plate arrives untrimmed and lowercased; the request carries the
    // normalized form.
    let record = verifier.verify(" abc123 ", AccessKind::General).await.unwrap();

    assert_eq!(record.plate, "ABC123");
    assert_eq!(record.kind, AccessKind::General);
    assert_eq!(
        record.outcome,
        VerificationOutcome::Granted {
            message: Some("Acceso autorizado".into()),
            days_remaining: None,
            due_date: None,
        }
    );

    latest.changed().await.unwrap();
    let published = latest.borrow().clone().unwrap();
    assert_eq!(published.plate, "ABC123");
}

#[tokio::test]
async fn structured_denial_under_error_status_becomes_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cocheras/verificar-acceso"))
        .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
            "status": "DENEGADO",
            "matricula": "XYZ789",
            "motivo": "Mensualidad vencida",
            "dias_restantes": -5
        })))
        .mount(&server)
        .await;

    let verifier = verifier_for(&server.uri());
    let record = verifier.verify("XYZ789", AccessKind::Secured).await.unwrap();

    assert_eq!(
        record.outcome,
        VerificationOutcome::Denied {
            reason: "Mensualidad vencida".into(),
            days_overdue: Some(5),
        }
    );
}

#[tokio::test]
async fn empty_plate_never_reaches_the_network() {
    let server = MockServer::start().await;
    // No mocks mounted; any request would 404 and the strict expect
    // below would flag it.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let verifier = verifier_for(&server.uri());
    let err = verifier.verify("   ", AccessKind::General).await.unwrap_err();

    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(verifier.latest_record().is_none());
}

#[tokio::test]
async fn unreachable_server_yields_an_error_outcome() {
    // Nothing listens on the discard port
    let verifier = verifier_for("http://127.0.0.1:1");
    let record = verifier.verify("ABC123", AccessKind::General).await.unwrap();

    assert!(matches!(
        record.outcome,
        VerificationOutcome::Error { .. }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn later_request_wins_over_a_slow_earlier_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .and(body_json(serde_json::json!({ "matricula": "SLOW11" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "acceso": true }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/general/verificar-acceso"))
        .and(body_json(serde_json::json!({ "matricula": "FAST22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "acceso": false,
            "mensaje": "Vehículo no registrado"
        })))
        .mount(&server)
        .await;

    let verifier = Arc::new(verifier_for(&server.uri()));

    let slow = {
        let verifier = Arc::clone(&verifier);
        tokio::spawn(async move { verifier.verify("SLOW11", AccessKind::General).await })
    };
    // Let the first request issue its ticket before the second starts.
    sleep(Duration::from_millis(100)).await;

    let fast = verifier.verify("FAST22", AccessKind::General).await.unwrap();
    assert_eq!(fast.ticket, 2);

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.ticket, 1);

    // The slow response resolved last but must not displace the newer one.
    let latest = verifier.latest_record().unwrap();
    assert_eq!(latest.ticket, 2);
    assert_eq!(latest.plate, "FAST22");
    assert!(matches!(
        latest.outcome,
        VerificationOutcome::Denied { .. }
    ));
}
