// Shared transport configuration for building reqwest::Client instances.
//
// The verification client gets its timeout and identification through this
// module so the settings live in one place rather than per call site.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("smartgate/0.1.0")
            .build()
            .map_err(|e| crate::error::Error::Client(format!("failed to build HTTP client: {e}")))
    }
}
