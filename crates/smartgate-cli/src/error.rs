//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use smartgate_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the access server at {url}: {reason}")]
    #[diagnostic(
        code(smartgate::connection_failed),
        help(
            "Check that the access server is running and reachable.\n\
             Try: smartgate verify ABC123 -s <server-url> -vv"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No access server configured")]
    #[diagnostic(
        code(smartgate::no_server),
        help("Pass --server <URL> or set the SMARTGATE_SERVER environment variable.")
    )]
    NoServer,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(smartgate::validation))]
    Validation { field: String, reason: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(smartgate::api_error))]
    Api { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(smartgate::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoServer | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "plate".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "server".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::Api {
                message: match status {
                    Some(status) => format!("{message} (HTTP {status})"),
                    None => message,
                },
            },

            err @ (CoreError::AlreadyStarted | CoreError::FeedStopped) => CliError::Api {
                message: err.to_string(),
            },

            CoreError::Internal(message) => CliError::Api { message },
        }
    }
}
