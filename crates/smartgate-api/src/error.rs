use thiserror::Error;

/// Top-level error type for the `smartgate-api` crate.
///
/// Covers every failure mode across both API surfaces: the WebSocket
/// detection stream and the HTTP verification endpoints.
/// `smartgate-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to build the underlying HTTP client.
    #[error("HTTP client error: {0}")]
    Client(String),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed or dropped with a protocol error.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Verification API ────────────────────────────────────────────
    /// Structured error from the verification API (`detail` payload).
    #[error("Verification API error (HTTP {status}): {message}")]
    AccessApi { message: String, status: u16 },

    /// Non-success status with no structured payload the client understands.
    #[error("Unexpected response from verification API (HTTP {status})")]
    UnexpectedStatus { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error represents a connectivity problem
    /// rather than a response the server produced deliberately.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_status(),
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }
}
