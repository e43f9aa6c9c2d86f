//! Reactive data layer between `smartgate-api` and UI consumers.
//!
//! This crate owns the business logic and domain model for the SmartGate
//! workspace:
//!
//! - **[`DetectionFeed`]** — Lifecycle owner for the live detection
//!   stream: [`start()`](DetectionFeed::start) opens the streaming
//!   connection (with automatic reconnection underneath) and spawns a
//!   single writer task that aggregates detections into bounded history,
//!   running stats, and a transient alert with an expiry timer.
//!   Snapshots are published as [`FeedState`] through `watch` channels.
//!
//! - **[`Verifier`]** — On-demand plate checks against the verification
//!   endpoints. Overlapping requests resolve last-write-wins by issue
//!   order, so a slow early response never overwrites a newer result.
//!
//! - **Domain model** ([`model`]) — Canonical types ([`DetectionEvent`],
//!   [`Stats`], [`AlertState`], [`VerificationOutcome`]) with
//!   [`DetectionId`] as the client-assigned arrival-order identity.

pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod verify;

mod aggregate;
mod convert;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FeedConfig, VerifierConfig};
pub use error::CoreError;
pub use feed::{DetectionFeed, FeedState};
pub use verify::{VerificationRecord, Verifier};

// Transport-layer types that appear in the core API surface.
pub use smartgate_api::{AccessKind, ConnectionState};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AlertState,
    DetectionEvent,
    DetectionId,
    OwnerInfo,
    PaymentState,
    Stats,
    VerificationOutcome,
};
