//! Command handlers.

pub mod verify;
pub mod watch;
