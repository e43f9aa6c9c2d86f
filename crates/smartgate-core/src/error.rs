// ── Core error types ──
//
// User-facing errors from smartgate-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<smartgate_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Feed lifecycle errors ────────────────────────────────────────
    #[error("Cannot connect to detection stream at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Detection feed already started")]
    AlreadyStarted,

    #[error("Detection feed is not running")]
    FeedStopped,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<smartgate_api::Error> for CoreError {
    fn from(err: smartgate_api::Error) -> Self {
        match err {
            smartgate_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            smartgate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            smartgate_api::Error::Client(msg) => CoreError::Config { message: msg },
            smartgate_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            smartgate_api::Error::AccessApi { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            smartgate_api::Error::UnexpectedStatus { status } => CoreError::Api {
                message: format!("unexpected response (HTTP {status})"),
                status: Some(status),
            },
            smartgate_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
