// ── Detection feed ──
//
// Full lifecycle management for the live detection stream: connection
// ownership, event aggregation, the alert-expiry timer, and reactive
// state publication through watch channels.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use smartgate_api::websocket::{
    ConnectionState, DetectionStreamHandle, StreamConfig, WireDetection,
};

use crate::aggregate::Aggregator;
use crate::config::FeedConfig;
use crate::convert;
use crate::error::CoreError;
use crate::model::{AlertState, DetectionEvent, DetectionId, Stats};

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── FeedState ────────────────────────────────────────────────────────

/// Point-in-time snapshot of the aggregated feed state.
///
/// Cheap to clone: detections are shared via `Arc`. Exactly one writer
/// (the feed task) produces these; any number of readers subscribe.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Most recent detection, if any.
    pub current: Option<Arc<DetectionEvent>>,
    /// Rolling history, newest first, bounded by the configured capacity.
    pub history: Vec<Arc<DetectionEvent>>,
    /// Lifetime counters for this feed.
    pub stats: Stats,
    /// The transient alert.
    pub alert: AlertState,
}

impl FeedState {
    fn empty() -> Self {
        Self {
            current: None,
            history: Vec::new(),
            stats: Stats::default(),
            alert: AlertState::hidden(),
        }
    }
}

// ── DetectionFeed ────────────────────────────────────────────────────

enum FeedCommand {
    DismissAlert,
}

/// The main entry point for live detection consumers.
///
/// Cheaply cloneable via `Arc`. Owns exactly one streaming connection at
/// a time (with automatic reconnection underneath) and a single writer
/// task that applies detections in arrival order.
///
/// The lifecycle is one-shot: after [`stop`](Self::stop), construct a new
/// feed to start again. Counters reset only with a new feed, never on
/// reconnection.
#[derive(Clone)]
pub struct DetectionFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    config: FeedConfig,
    state_tx: watch::Sender<Arc<FeedState>>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: mpsc::Sender<FeedCommand>,
    command_rx: Mutex<Option<mpsc::Receiver<FeedCommand>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DetectionFeed {
    /// Create a feed from configuration. Does NOT connect -- call
    /// [`start()`](Self::start) to open the stream and begin aggregating.
    pub fn new(config: FeedConfig) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(FeedState::empty()));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(FeedInner {
                config,
                state_tx,
                connection_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the feed configuration.
    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the streaming connection and spawn the aggregation task.
    ///
    /// Returns immediately; connection progress is observable through
    /// [`connection_state`](Self::connection_state). Calling `start`
    /// twice is an error -- the feed owns at most one stream.
    pub async fn start(&self) -> Result<(), CoreError> {
        let commands = self
            .inner
            .command_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyStarted)?;

        let stream = DetectionStreamHandle::connect(
            self.inner.config.ws_url.clone(),
            StreamConfig {
                reconnect_delay: self.inner.config.reconnect_delay,
                keepalive_interval: self.inner.config.keepalive_interval,
            },
            self.inner.cancel.clone(),
        );

        let task = FeedTask {
            state_tx: self.inner.state_tx.clone(),
            conn_tx: self.inner.connection_state.clone(),
            frames: stream.subscribe(),
            stream_state: stream.state(),
            commands,
            cancel: self.inner.cancel.clone(),
            agg: Aggregator::new(
                self.inner.config.history_capacity,
                self.inner.config.alert_duration,
            ),
            alert_duration: self.inner.config.alert_duration,
            alert_deadline: None,
            next_id: 0,
        };

        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(task.run()));

        debug!(url = %self.inner.config.ws_url, "detection feed started");
        Ok(())
    }

    /// Tear the feed down: cancel the stream, join the aggregation task,
    /// and clear any pending alert timer. Idempotent; after `stop`
    /// returns, no further state mutation occurs -- late frames and fired
    /// timers land in a finished task.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let _ = self.inner.connection_state.send(ConnectionState::Disconnected);
        debug!("detection feed stopped");
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to aggregated state snapshots.
    pub fn state(&self) -> watch::Receiver<Arc<FeedState>> {
        self.inner.state_tx.subscribe()
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<FeedState> {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    // ── User actions ─────────────────────────────────────────────

    /// Dismiss the visible alert early, cancelling its expiry timer.
    pub async fn dismiss_alert(&self) -> Result<(), CoreError> {
        self.inner
            .command_tx
            .send(FeedCommand::DismissAlert)
            .await
            .map_err(|_| CoreError::FeedStopped)
    }
}

// ── Feed task ────────────────────────────────────────────────────────

/// The single writer over the aggregated state. Every mutation source --
/// decoded frames, the alert-expiry timer, dismiss commands -- is
/// serialized through this task's select loop, so events apply in strict
/// arrival order and the alert has at most one pending deadline.
struct FeedTask {
    state_tx: watch::Sender<Arc<FeedState>>,
    conn_tx: watch::Sender<ConnectionState>,
    frames: broadcast::Receiver<Arc<WireDetection>>,
    stream_state: watch::Receiver<ConnectionState>,
    commands: mpsc::Receiver<FeedCommand>,
    cancel: CancellationToken,
    agg: Aggregator,
    alert_duration: Duration,
    alert_deadline: Option<Instant>,
    next_id: u64,
}

impl FeedTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,

                () = tokio::time::sleep_until(
                    self.alert_deadline.unwrap_or_else(Instant::now)
                ), if self.alert_deadline.is_some() => {
                    debug!("alert expired");
                    self.agg.clear_alert();
                    self.alert_deadline = None;
                    self.publish();
                }

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(FeedCommand::DismissAlert) => {
                            debug!("alert dismissed");
                            self.agg.clear_alert();
                            self.alert_deadline = None;
                            self.publish();
                        }
                        None => break,
                    }
                }

                changed = self.stream_state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *self.stream_state.borrow_and_update();
                    let _ = self.conn_tx.send(state);
                }

                frame = self.frames.recv() => {
                    match frame {
                        Ok(raw) => self.on_frame(&raw),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "detection stream lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        debug!("feed task exiting");
    }

    fn on_frame(&mut self, raw: &WireDetection) {
        let now = Utc::now();
        let id = DetectionId::new(self.next_id);
        self.next_id += 1;

        let event = convert::detection_from_wire(raw, id, now);
        debug!(
            id = %event.id,
            plate = %event.plate,
            granted = event.access_granted,
            "detection received"
        );

        self.agg.on_event(event, now);
        // Swap the pending expiry: only ever one deadline outstanding.
        self.alert_deadline = Some(Instant::now() + self.alert_duration);
        self.publish();
    }

    fn publish(&self) {
        let _ = self.state_tx.send(Arc::new(self.agg.snapshot()));
    }
}
