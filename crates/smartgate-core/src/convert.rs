// ── Wire → domain conversion ──
//
// Stamps the client-side identity (monotonic id, receive timestamp) that
// the wire payload is never trusted to carry.

use chrono::{DateTime, Utc};
use smartgate_api::WireDetection;

use crate::model::{DetectionEvent, DetectionId, OwnerInfo, PaymentState};

/// Build a [`DetectionEvent`] from a decoded wire payload.
pub(crate) fn detection_from_wire(
    raw: &WireDetection,
    id: DetectionId,
    received_at: DateTime<Utc>,
) -> DetectionEvent {
    let owner = if raw.owner_name.is_some()
        || raw.unit.is_some()
        || raw.phone.is_some()
        || raw.email.is_some()
    {
        Some(OwnerInfo {
            name: raw.owner_name.clone(),
            unit: raw.unit.clone(),
            phone: raw.phone.clone(),
            email: raw.email.clone(),
        })
    } else {
        None
    };

    let payment =
        if raw.days_remaining.is_some() || raw.due_date.is_some() || raw.denial_reason.is_some() {
            Some(PaymentState {
                days_remaining: raw.days_remaining,
                due_date: raw.due_date.clone(),
                denial_reason: raw.denial_reason.clone(),
            })
        } else {
            None
        };

    DetectionEvent {
        id,
        plate: raw.plate.trim().to_uppercase(),
        access_granted: raw.access_granted,
        confidence: raw.confidence,
        owner,
        payment,
        quota_code: raw.quota_code,
        received_at,
        reported_at: raw.reported_at.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_wire(plate: &str, access_granted: bool) -> WireDetection {
        serde_json::from_value(serde_json::json!({
            "matricula": plate,
            "acceso": access_granted,
        }))
        .expect("valid wire payload")
    }

    #[test]
    fn plate_is_trimmed_and_uppercased() {
        let raw = minimal_wire("  abc123 ", true);
        let event = detection_from_wire(&raw, DetectionId::new(1), Utc::now());
        assert_eq!(event.plate, "ABC123");
    }

    #[test]
    fn minimal_payload_has_no_owner_or_payment() {
        let raw = minimal_wire("ABC123", true);
        let event = detection_from_wire(&raw, DetectionId::new(1), Utc::now());
        assert!(event.owner.is_none());
        assert!(event.payment.is_none());
        assert!(event.confidence.is_none());
    }

    #[test]
    fn full_payload_maps_owner_and_payment() {
        let raw: WireDetection = serde_json::from_value(serde_json::json!({
            "matricula": "XYZ789",
            "acceso": false,
            "confianza": 0.9,
            "propietario": "J. Paz",
            "departamento": "4B",
            "estado_cuota": 1,
            "dias_restantes": -3,
            "fecha_vencimiento": "2026-08-01",
            "motivo": "Mensualidad vencida",
            "timestamp": "2026-08-27T12:00:00"
        }))
        .expect("valid wire payload");

        let received_at = Utc::now();
        let event = detection_from_wire(&raw, DetectionId::new(7), received_at);

        assert_eq!(event.id.value(), 7);
        assert_eq!(event.received_at, received_at);
        assert_eq!(event.quota_code, Some(1));

        let owner = event.owner.expect("owner");
        assert_eq!(owner.name.as_deref(), Some("J. Paz"));
        assert_eq!(owner.unit.as_deref(), Some("4B"));

        let payment = event.payment.expect("payment");
        assert_eq!(payment.days_remaining, Some(-3));
        assert_eq!(payment.denial_reason.as_deref(), Some("Mensualidad vencida"));
    }
}
