//! Clap derive structures for the `smartgate` CLI.

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::error::CliError;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// smartgate -- terminal client for the SmartGate access server
#[derive(Debug, Parser)]
#[command(
    name = "smartgate",
    version,
    about = "Watch vehicle detections and verify plate access from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Access server base URL (e.g. https://gate.example.com)
    #[arg(long, short = 's', env = "SMARTGATE_SERVER", global = true)]
    pub server: Option<String>,

    /// Detection stream URL (overrides the one derived from --server)
    #[arg(long, env = "SMARTGATE_STREAM_URL", global = true)]
    pub stream_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "SMARTGATE_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalOpts {
    /// The verification API base URL.
    pub fn base_url(&self) -> Result<Url, CliError> {
        let raw = self.server.as_deref().ok_or(CliError::NoServer)?;
        raw.parse().map_err(|_| CliError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {raw}"),
        })
    }

    /// The detection stream URL: the explicit override when given,
    /// otherwise derived from the base URL.
    pub fn stream_endpoint(&self) -> Result<Url, CliError> {
        if let Some(raw) = self.stream_url.as_deref() {
            return raw.parse().map_err(|_| CliError::Validation {
                field: "stream-url".into(),
                reason: format!("invalid URL: {raw}"),
            });
        }
        derive_stream_url(&self.base_url()?)
    }
}

/// Map the server base URL onto its WebSocket detection endpoint
/// (`http` -> `ws`, `https` -> `wss`, path `/auto-access/ws`).
fn derive_stream_url(base: &Url) -> Result<Url, CliError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CliError::Validation {
                field: "server".into(),
                reason: format!("unsupported URL scheme: {other}"),
            });
        }
    };

    let mut url = base.clone();
    url.set_scheme(scheme).map_err(|()| CliError::Validation {
        field: "server".into(),
        reason: format!("cannot derive stream URL from {base}"),
    })?;

    let joined = format!("{}/auto-access/ws", url.as_str().trim_end_matches('/'));
    joined.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("cannot derive stream URL from {base}"),
    })
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the live detection stream
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Check a plate against the verification endpoints
    #[command(alias = "v")]
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Rolling history capacity
    #[arg(long, default_value = "100")]
    pub history: usize,

    /// Print running totals after each detection
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Licence plate to check
    pub plate: String,

    /// Use the secured-garage endpoint (includes payment standing)
    #[arg(long)]
    pub secured: bool,

    /// Emit the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

// ── Tests ────────────────────────────────────────────────────────────
