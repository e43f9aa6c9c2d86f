// Verification API HTTP client
//
// One-shot request/response checks against the access server, independent
// of the streaming connection. Wraps `reqwest::Client` with endpoint
// selection and the server's mixed success/denial body conventions.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── AccessKind ───────────────────────────────────────────────────────

/// Which verification endpoint to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Basic permit check.
    General,
    /// Full check including garage assignment and payment standing.
    Secured,
}

// ── EndpointPaths ────────────────────────────────────────────────────

/// Relative paths of the two verification endpoints, joined onto the
/// configured base URL.
#[derive(Debug, Clone)]
pub struct EndpointPaths {
    pub general: String,
    pub secured: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            general: "general/verificar-acceso".into(),
            secured: "cocheras/verificar-acceso".into(),
        }
    }
}

// ── Response types ───────────────────────────────────────────────────

/// Access verdict string used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AccessStatus {
    #[serde(rename = "PERMITIDO")]
    Permitted,
    #[serde(rename = "DENEGADO")]
    Denied,
    #[serde(rename = "PENDIENTE")]
    Pending,
    /// Forward-compatible catch-all for verdicts this client predates.
    #[serde(other)]
    Unknown,
}

/// Structured verification response.
///
/// The server is inconsistent about shape: some endpoints send a
/// `status` verdict string, others only an `acceso` boolean, and denial
/// payloads can arrive under error statuses. Both indicators are kept and
/// reconciled by [`is_granted`](Self::is_granted).
#[derive(Debug, Clone, Deserialize)]
pub struct AccessDecision {
    #[serde(default)]
    pub status: Option<AccessStatus>,

    #[serde(rename = "acceso", default)]
    pub access: Option<bool>,

    #[serde(rename = "matricula", default)]
    pub plate: Option<String>,

    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,

    #[serde(rename = "motivo", default)]
    pub reason: Option<String>,

    #[serde(rename = "dias_restantes", default)]
    pub days_remaining: Option<i64>,

    #[serde(rename = "fecha_vencimiento", default)]
    pub due_date: Option<String>,
}

impl AccessDecision {
    /// Whether the server granted access. The `status` verdict wins when
    /// present; otherwise the bare `acceso` flag decides.
    pub fn is_granted(&self) -> bool {
        match self.status {
            Some(AccessStatus::Permitted) => true,
            Some(_) => false,
            None => self.access.unwrap_or(false),
        }
    }
}

/// Error payload shape (`detail` per the server's HTTP error convention).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct PlateRequest<'a> {
    matricula: &'a str,
}

// ── VerificationClient ───────────────────────────────────────────────

/// HTTP client for the on-demand plate verification endpoints.
pub struct VerificationClient {
    http: reqwest::Client,
    general_url: Url,
    secured_url: Url,
}

impl VerificationClient {
    /// Create a verification client for the given server base URL.
    pub fn new(
        base_url: &Url,
        endpoints: &EndpointPaths,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            general_url: endpoint_url(base_url, &endpoints.general)?,
            secured_url: endpoint_url(base_url, &endpoints.secured)?,
        })
    }

    /// Check a plate against one of the two verification endpoints.
    ///
    /// `plate` is sent as given; callers normalize (trim + uppercase)
    /// before the request. Returns an [`AccessDecision`] for any response
    /// the server produced deliberately -- including structured denial
    /// payloads delivered under error statuses -- and an [`Error`] for
    /// transport faults and unintelligible responses.
    pub async fn verify(&self, plate: &str, kind: AccessKind) -> Result<AccessDecision, Error> {
        let url = match kind {
            AccessKind::General => &self.general_url,
            AccessKind::Secured => &self.secured_url,
        };

        debug!(%url, plate, "POST verification request");

        let resp = self
            .http
            .post(url.clone())
            .json(&PlateRequest { matricula: plate })
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }

        // `detail` is the server's plain error convention
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            if let Some(detail) = err.detail {
                return Err(Error::AccessApi {
                    message: detail,
                    status: status.as_u16(),
                });
            }
        }

        // Some denial responses come back under error statuses but carry
        // the full structured payload; surface those as decisions.
        if let Ok(decision) = serde_json::from_str::<AccessDecision>(&body) {
            if decision.reason.is_some() {
                debug!(status = status.as_u16(), "structured denial under error status");
                return Ok(decision);
            }
        }

        Err(Error::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}

/// Join a relative endpoint path onto the server base URL.
fn endpoint_url(base_url: &Url, path: &str) -> Result<Url, Error> {
    let full = format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&full)?)
}

// ── Tests ────────────────────────────────────────────────────────────
