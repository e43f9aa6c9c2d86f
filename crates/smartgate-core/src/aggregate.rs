// ── Detection aggregator ──
//
// The single-writer state machine behind a DetectionFeed. Synchronous and
// allocation-light: the feed task owns one instance and applies events in
// strict arrival order, so no locking is needed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::feed::FeedState;
use crate::model::{AlertState, DetectionEvent, Stats};

pub(crate) struct Aggregator {
    capacity: usize,
    alert_duration: Duration,
    current: Option<Arc<DetectionEvent>>,
    /// Newest first, bounded to `capacity`, ordered strictly by arrival.
    history: VecDeque<Arc<DetectionEvent>>,
    stats: Stats,
    alert: AlertState,
}

impl Aggregator {
    pub(crate) fn new(capacity: usize, alert_duration: Duration) -> Self {
        Self {
            capacity,
            alert_duration,
            current: None,
            history: VecDeque::with_capacity(capacity),
            stats: Stats::default(),
            alert: AlertState::hidden(),
        }
    }

    /// Apply one detection. The sole mutation entry point for detections:
    /// updates current, history, stats, and replaces the alert, restarting
    /// its expiry window.
    pub(crate) fn on_event(&mut self, event: DetectionEvent, now: DateTime<Utc>) {
        let event = Arc::new(event);

        self.current = Some(Arc::clone(&event));

        self.history.push_front(Arc::clone(&event));
        self.history.truncate(self.capacity);

        self.stats.record(event.access_granted);

        // Replacing the alert abandons any previous expiry window; the
        // feed task swaps its pending deadline in the same step.
        self.alert = AlertState {
            visible: true,
            detection: Some(event),
            expires_at: Some(now + self.alert_duration),
        };
    }

    /// Hide the alert, whether by user dismissal or expiry.
    pub(crate) fn clear_alert(&mut self) {
        self.alert = AlertState::hidden();
    }

    pub(crate) fn snapshot(&self) -> FeedState {
        FeedState {
            current: self.current.clone(),
            history: self.history.iter().map(Arc::clone).collect(),
            stats: self.stats,
            alert: self.alert.clone(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
