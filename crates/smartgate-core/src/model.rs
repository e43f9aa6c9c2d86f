// ── Domain model ──
//
// Typed views of what the wire carries, owned by the core crate so
// consumers never touch serde field renames or the server's optional-soup
// payloads directly.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

// ── DetectionId ──────────────────────────────────────────────────────

/// Client-assigned identity of a detection event.
///
/// A plain monotonic counter per feed: unique even for same-millisecond
/// bursts, and strictly ordered by arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DetectionId(u64);

impl DetectionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── DetectionEvent ───────────────────────────────────────────────────

/// One plate-recognition result pushed by the server. Immutable once
/// constructed.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub id: DetectionId,
    /// Plate, trimmed and uppercased.
    pub plate: String,
    pub access_granted: bool,
    /// Recognition confidence in `0..=1`.
    pub confidence: Option<f64>,
    pub owner: Option<OwnerInfo>,
    pub payment: Option<PaymentState>,
    /// Quota state code from the vehicle record.
    pub quota_code: Option<i32>,
    /// Client-assigned receive timestamp; the ordering authority.
    pub received_at: DateTime<Utc>,
    /// Server-supplied event time, display only.
    pub reported_at: Option<String>,
}

/// Registered owner details, present when the plate is known.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerInfo {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Payment standing attached to a detection.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentState {
    /// Days left on the current period; negative when overdue.
    pub days_remaining: Option<i64>,
    pub due_date: Option<String>,
    pub denial_reason: Option<String>,
}

// ── Stats ────────────────────────────────────────────────────────────

/// Running counters over the life of a feed.
///
/// `total == granted + denied` holds after every update; counters are
/// monotonic and survive reconnections -- only a new feed resets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: u64,
    pub granted: u64,
    pub denied: u64,
}

impl Stats {
    pub(crate) fn record(&mut self, access_granted: bool) {
        self.total += 1;
        if access_granted {
            self.granted += 1;
        } else {
            self.denied += 1;
        }
        debug_assert_eq!(self.total, self.granted + self.denied);
    }
}

// ── AlertState ───────────────────────────────────────────────────────

/// The transient detection alert.
///
/// A new detection always replaces the displayed one and restarts the
/// expiry window; the feed guarantees at most one pending expiry timer.
#[derive(Debug, Clone, Serialize)]
pub struct AlertState {
    pub visible: bool,
    pub detection: Option<Arc<DetectionEvent>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AlertState {
    pub(crate) fn hidden() -> Self {
        Self {
            visible: false,
            detection: None,
            expires_at: None,
        }
    }
}

// ── VerificationOutcome ──────────────────────────────────────────────

/// Result of one on-demand plate check. No persistent lifecycle --
/// replaced by the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerificationOutcome {
    Granted {
        message: Option<String>,
        days_remaining: Option<i64>,
        due_date: Option<String>,
    },
    Denied {
        reason: String,
        days_overdue: Option<i64>,
    },
    Error {
        message: String,
    },
}
