// smartgate-api: Async Rust client for the SmartGate access server
// (WebSocket detection stream + HTTP verification API)

pub mod error;
pub mod transport;
pub mod verify;
pub mod websocket;

pub use error::Error;
pub use transport::TransportConfig;
pub use verify::{AccessDecision, AccessKind, AccessStatus, EndpointPaths, VerificationClient};
pub use websocket::{ConnectionState, DetectionStreamHandle, StreamConfig, WireDetection};
