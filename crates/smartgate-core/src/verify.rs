// ── On-demand plate verification ──
//
// Request/response counterpart to the detection feed. Stateless per
// request apart from the "latest result" slot, which is guarded so an
// older request resolving late can never overwrite a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use smartgate_api::{AccessDecision, AccessKind, TransportConfig, VerificationClient};

use crate::config::VerifierConfig;
use crate::error::CoreError;
use crate::model::VerificationOutcome;

// ── VerificationRecord ───────────────────────────────────────────────

/// One completed verification, as published to observers.
#[derive(Debug, Clone)]
pub struct VerificationRecord {
    /// Issue-order ticket; later requests carry strictly larger tickets.
    pub ticket: u64,
    /// Normalized plate the check ran against.
    pub plate: String,
    pub kind: AccessKind,
    pub outcome: VerificationOutcome,
    pub completed_at: DateTime<Utc>,
}

// ── Verifier ─────────────────────────────────────────────────────────

/// Runs plate checks and tracks the most recent result.
///
/// Requests may overlap; the published "latest" slot always reflects the
/// most recently *issued* request that has completed, so a slow early
/// response cannot clobber a fast later one.
pub struct Verifier {
    client: VerificationClient,
    issued: AtomicU64,
    latest: watch::Sender<Option<Arc<VerificationRecord>>>,
}

impl Verifier {
    /// Build a verifier from configuration.
    pub fn new(config: &VerifierConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let client = VerificationClient::new(&config.base_url, &config.endpoints, &transport)?;
        let (latest, _) = watch::channel(None);

        Ok(Self {
            client,
            issued: AtomicU64::new(0),
            latest,
        })
    }

    /// Check a plate against the selected endpoint.
    ///
    /// The plate is trimmed and uppercased first; an empty plate fails
    /// validation without touching the network. Server-side denials and
    /// transport faults both come back as an [`VerificationOutcome`]
    /// inside the record -- `Err` here means the request never ran.
    pub async fn verify(
        &self,
        plate: &str,
        kind: AccessKind,
    ) -> Result<Arc<VerificationRecord>, CoreError> {
        let plate = normalize_plate(plate)?;
        let ticket = self.issued.fetch_add(1, Ordering::Relaxed) + 1;

        debug!(ticket, %plate, ?kind, "verification requested");

        let outcome = match self.client.verify(&plate, kind).await {
            Ok(decision) => outcome_from_decision(&decision),
            Err(err) => outcome_from_error(&err),
        };

        let record = Arc::new(VerificationRecord {
            ticket,
            plate,
            kind,
            outcome,
            completed_at: Utc::now(),
        });

        self.publish(&record);
        Ok(record)
    }

    /// Subscribe to the latest completed verification.
    pub fn latest(&self) -> watch::Receiver<Option<Arc<VerificationRecord>>> {
        self.latest.subscribe()
    }

    /// The most recent result, if any request has completed.
    pub fn latest_record(&self) -> Option<Arc<VerificationRecord>> {
        self.latest.borrow().clone()
    }

    /// Last-write-wins by issue order, not completion order.
    fn publish(&self, record: &Arc<VerificationRecord>) {
        self.latest.send_if_modified(|slot| {
            let newer = slot.as_ref().is_none_or(|cur| record.ticket > cur.ticket);
            if newer {
                *slot = Some(Arc::clone(record));
            } else {
                debug!(
                    ticket = record.ticket,
                    "stale verification result discarded"
                );
            }
            newer
        });
    }
}

// ── Outcome mapping ──────────────────────────────────────────────────

fn normalize_plate(plate: &str) -> Result<String, CoreError> {
    let normalized = plate.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: "plate must not be empty".into(),
        });
    }
    Ok(normalized)
}

fn outcome_from_decision(decision: &AccessDecision) -> VerificationOutcome {
    if decision.is_granted() {
        VerificationOutcome::Granted {
            message: decision.message.clone(),
            days_remaining: decision.days_remaining,
            due_date: decision.due_date.clone(),
        }
    } else {
        let reason = decision
            .reason
            .clone()
            .or_else(|| decision.message.clone())
            .unwrap_or_else(|| "access denied".into());
        VerificationOutcome::Denied {
            reason,
            days_overdue: decision.days_remaining.filter(|d| *d < 0).map(i64::abs),
        }
    }
}

fn outcome_from_error(err: &smartgate_api::Error) -> VerificationOutcome {
    let message = match err {
        smartgate_api::Error::AccessApi { message, .. } => message.clone(),
        e if e.is_connectivity() => "cannot reach the verification server".into(),
        e => e.to_string(),
    };
    VerificationOutcome::Error { message }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decision(json: serde_json::Value) -> AccessDecision {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn plate_normalization() {
        assert_eq!(normalize_plate(" abc123 ").unwrap(), "ABC123");
        assert_eq!(normalize_plate("XYZ789").unwrap(), "XYZ789");
        assert!(matches!(
            normalize_plate("   "),
            Err(CoreError::ValidationFailed { .. })
        ));
        assert!(matches!(
            normalize_plate(""),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn granted_decision_maps_payment_details() {
        let outcome = outcome_from_decision(&decision(serde_json::json!({
            "status": "PERMITIDO",
            "mensaje": "Acceso autorizado",
            "dias_restantes": 12,
            "fecha_vencimiento": "2026-09-08"
        })));

        assert_eq!(
            outcome,
            VerificationOutcome::Granted {
                message: Some("Acceso autorizado".into()),
                days_remaining: Some(12),
                due_date: Some("2026-09-08".into()),
            }
        );
    }

    #[test]
    fn denied_decision_prefers_reason_and_computes_overdue() {
        let outcome = outcome_from_decision(&decision(serde_json::json!({
            "status": "DENEGADO",
            "mensaje": "Acceso denegado",
            "motivo": "Mensualidad vencida",
            "dias_restantes": -5
        })));

        assert_eq!(
            outcome,
            VerificationOutcome::Denied {
                reason: "Mensualidad vencida".into(),
                days_overdue: Some(5),
            }
        );
    }

    #[test]
    fn denied_decision_falls_back_to_message_then_generic() {
        let outcome = outcome_from_decision(&decision(serde_json::json!({
            "acceso": false,
            "mensaje": "Vehículo no registrado"
        })));
        assert_eq!(
            outcome,
            VerificationOutcome::Denied {
                reason: "Vehículo no registrado".into(),
                days_overdue: None,
            }
        );

        let outcome = outcome_from_decision(&decision(serde_json::json!({})));
        assert_eq!(
            outcome,
            VerificationOutcome::Denied {
                reason: "access denied".into(),
                days_overdue: None,
            }
        );
    }

    #[test]
    fn pending_is_a_denial_with_the_server_message() {
        let outcome = outcome_from_decision(&decision(serde_json::json!({
            "status": "PENDIENTE",
            "mensaje": "Verificación en proceso"
        })));
        assert_eq!(
            outcome,
            VerificationOutcome::Denied {
                reason: "Verificación en proceso".into(),
                days_overdue: None,
            }
        );
    }

    #[test]
    fn api_error_with_detail_keeps_the_server_message() {
        let outcome = outcome_from_error(&smartgate_api::Error::AccessApi {
            message: "Matrícula inválida".into(),
            status: 422,
        });
        assert_eq!(
            outcome,
            VerificationOutcome::Error {
                message: "Matrícula inválida".into(),
            }
        );
    }
}
