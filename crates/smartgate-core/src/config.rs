// ── Runtime configuration ──
//
// These types describe *how* to reach the access server and how the feed
// behaves. The CLI (or any other consumer) constructs them and hands them
// in -- core never reads config files.

use std::time::Duration;

use smartgate_api::EndpointPaths;
use url::Url;

/// How many detections the rolling history retains.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// How long a detection alert stays visible without being dismissed.
pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_secs(6);

/// Interval between outbound liveness probes on the stream connection.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed delay before reconnecting after the stream drops.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(4);

/// Request timeout for verification calls.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`DetectionFeed`](crate::feed::DetectionFeed).
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Detection stream endpoint (e.g. `wss://host/auto-access/ws`).
    pub ws_url: Url,
    /// Rolling history capacity.
    pub history_capacity: usize,
    /// Alert visibility window.
    pub alert_duration: Duration,
    /// Keepalive probe interval while connected.
    pub keepalive_interval: Duration,
    /// Delay before reconnecting after a drop.
    pub reconnect_delay: Duration,
}

impl FeedConfig {
    /// Feed configuration with default tuning for the given stream URL.
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            alert_duration: DEFAULT_ALERT_DURATION,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Configuration for a [`Verifier`](crate::verify::Verifier).
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Verification API base URL (e.g. `https://host/`).
    pub base_url: Url,
    /// Relative paths of the two verification endpoints.
    pub endpoints: EndpointPaths,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl VerifierConfig {
    /// Verifier configuration with default endpoints and timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            endpoints: EndpointPaths::default(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}
