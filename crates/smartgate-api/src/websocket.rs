//! Detection event stream with auto-reconnect.
//!
//! Connects to the SmartGate server's detection WebSocket endpoint and
//! streams decoded plate detections through a [`tokio::sync::broadcast`]
//! channel. Handles keepalive probes and reconnection with a fixed delay
//! automatically; connection state is observable via a watch channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use smartgate_api::websocket::{DetectionStreamHandle, StreamConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("wss://smartgate.example/auto-access/ws")?;
//!
//! let handle = DetectionStreamHandle::connect(ws_url, StreamConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(detection) = rx.recv().await {
//!     println!("{}: granted={}", detection.plate, detection.access_granted);
//! }
//!
//! handle.shutdown();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Channel capacity / keepalive payload ─────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Opaque liveness token. The server only needs *something* inbound to
/// keep the socket from idling out; it never parses the payload.
const KEEPALIVE_TEXT: &str = "ping";

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state of the detection stream, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

// ── WireDetection ────────────────────────────────────────────────────

/// A plate detection as the server sends it over the wire.
///
/// Field names follow the server's JSON (Spanish); everything beyond the
/// plate and the access verdict is optional because the detector omits
/// fields it has no data for. The client-side receive timestamp and event
/// id are assigned downstream, never trusted from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDetection {
    /// Detected plate, e.g. `"ABC123"`. Casing is normalized downstream.
    #[serde(rename = "matricula")]
    pub plate: String,

    /// Whether the server granted access for this detection.
    #[serde(rename = "acceso")]
    pub access_granted: bool,

    /// Recognition confidence in `0..=1`.
    #[serde(rename = "confianza", default)]
    pub confidence: Option<f64>,

    /// Registered owner name, if the plate is known.
    #[serde(rename = "propietario", default)]
    pub owner_name: Option<String>,

    /// Apartment/garage unit. The server sends either a label or a raw
    /// numeric id, so both are accepted.
    #[serde(rename = "departamento", default, deserialize_with = "stringy")]
    pub unit: Option<String>,

    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Quota state code from the vehicle record.
    #[serde(rename = "estado_cuota", default)]
    pub quota_code: Option<i32>,

    /// Days left on the current payment period (negative when overdue).
    #[serde(rename = "dias_restantes", default)]
    pub days_remaining: Option<i64>,

    #[serde(rename = "fecha_vencimiento", default)]
    pub due_date: Option<String>,

    /// Denial reason, present when `access_granted` is false.
    #[serde(rename = "motivo", default)]
    pub denial_reason: Option<String>,

    /// Server-supplied event time. Display-only; ordering and identity
    /// come from the client-assigned receive timestamp.
    #[serde(rename = "timestamp", default, deserialize_with = "stringy")]
    pub reported_at: Option<String>,
}

/// Accept a string, a number, or null for fields the server is sloppy about.
fn stringy<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }))
}

// ── StreamConfig ─────────────────────────────────────────────────────

/// Tuning for the detection stream connection loop.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Fixed delay before re-entering CONNECTING after any close or error.
    /// Default: 4s.
    pub reconnect_delay: Duration,

    /// Interval between outbound liveness probes while connected.
    /// Default: 10s.
    pub keepalive_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(4),
            keepalive_interval: Duration::from_secs(10),
        }
    }
}

// ── DetectionStreamHandle ────────────────────────────────────────────

/// Handle to a running detection stream.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear it down.
pub struct DetectionStreamHandle {
    frame_rx: broadcast::Receiver<Arc<WireDetection>>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl DetectionStreamHandle {
    /// Spawn the connection loop against the detection WebSocket endpoint.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Subscribe to the frame receiver to consume
    /// detections and to [`state`](Self::state) to observe connectivity.
    pub fn connect(ws_url: Url, config: StreamConfig, cancel: CancellationToken) -> Self {
        let (frame_tx, frame_rx) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, frame_tx, state_tx, config, task_cancel).await;
        });

        Self {
            frame_rx,
            state_rx,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the detection stream.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<WireDetection>> {
        self.frame_rx.resubscribe()
    }

    /// Observe connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down gracefully. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on close or error, fixed delay → reconnect.
///
/// Exactly one logical connection attempt is outstanding at any time:
/// this single loop is the only place a connection is opened, and the
/// reconnect sleep below is the only pending reconnection timer.
async fn ws_loop(
    ws_url: Url,
    frame_tx: broadcast::Sender<Arc<WireDetection>>,
    state_tx: watch::Sender<ConnectionState>,
    config: StreamConfig,
    cancel: CancellationToken,
) {
    loop {
        let _ = state_tx.send(ConnectionState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &frame_tx, &state_tx, &config, &cancel) => {
                let _ = state_tx.send(ConnectionState::Disconnected);

                match result {
                    Ok(()) => {
                        tracing::info!("detection stream disconnected, reconnecting");
                    }
                    Err(e) => {
                        // Transport faults are non-fatal and never surface
                        // to the caller; the retry below is the recovery.
                        tracing::warn!(error = %e, "detection stream error");
                    }
                }

                if cancel.is_cancelled() {
                    break;
                }

                tracing::debug!(delay = ?config.reconnect_delay, "waiting before reconnect");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.reconnect_delay) => {}
                }
            }
        }
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
    tracing::debug!("detection stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection and read frames until it drops,
/// sending a keepalive probe on a fixed interval.
async fn connect_and_read(
    url: &Url,
    frame_tx: &broadcast::Sender<Arc<WireDetection>>,
    state_tx: &watch::Sender<ConnectionState>,
    config: &StreamConfig,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to detection stream");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("detection stream connected");
    let _ = state_tx.send(ConnectionState::Connected);

    let (mut write, mut read) = ws_stream.split();

    // First tick fires immediately, so a probe goes out right on open.
    let mut keepalive = tokio::time::interval(config.keepalive_interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            _ = keepalive.tick() => {
                // Best effort: a failed probe is not fatal. The read
                // side's close/error is the authoritative failure signal.
                if let Err(e) = write
                    .send(tungstenite::Message::Text(KEEPALIVE_TEXT.into()))
                    .await
                {
                    tracing::debug!(error = %e, "keepalive send failed");
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        decode_and_broadcast(text.as_str(), frame_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite replies with pongs automatically
                        tracing::trace!("detection stream ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "close frame received"
                            );
                        } else {
                            tracing::info!("close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("detection stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame decoding ───────────────────────────────────────────────────

/// Envelope around every server frame: `{ "type": ..., "data": {...} }`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode a text frame into a detection, or `None` when the frame is not
/// one. Malformed frames and unknown types are dropped here; they must
/// never propagate a fault that would tear down the connection loop.
fn decode_frame(text: &str) -> Option<WireDetection> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse stream envelope");
            return None;
        }
    };

    // Forward-compatible: any other frame type is ignored safely.
    if envelope.kind != "detection" {
        tracing::trace!(kind = %envelope.kind, "ignoring frame type");
        return None;
    }

    match serde_json::from_value(envelope.data) {
        Ok(detection) => Some(detection),
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed detection payload");
            None
        }
    }
}

fn decode_and_broadcast(text: &str, frame_tx: &broadcast::Sender<Arc<WireDetection>>) {
    if let Some(detection) = decode_frame(text) {
        // Ignore send errors -- just means no active subscribers right now
        let _ = frame_tx.send(Arc::new(detection));
    }
}

// ── Tests ────────────────────────────────────────────────────────────
