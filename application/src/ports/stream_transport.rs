//! Stream transport port
//!
//! Defines the streaming duplex connection used for live room events.
//!
//! The transport is deliberately synchronous at its surface: `connect` starts
//! a background dial and returns immediately, and every outcome (connected,
//! frame, close, failure) arrives on the event channel handed to the adapter
//! at construction. Errors are never thrown from `connect`.

use horo_domain::{ChatMessage, Credential, OutboundAction};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors reported by a transport adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Handshake rejected with status {0}")]
    HandshakeRejected(u16),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Transport closed")]
    Closed,
}

/// Something observed on the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is open and authenticated.
    Connected,
    /// The connection closed after having been open.
    Disconnected { reason: String },
    /// A decoded inbound frame. Malformed frames never surface here.
    Frame(ChatMessage),
    /// A connection attempt failed, or an open connection errored.
    Failed(TransportError),
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create the event channel a transport adapter delivers on.
pub fn transport_channel() -> (TransportEventSender, TransportEventReceiver) {
    mpsc::unbounded_channel()
}

/// One streaming connection, owned by the session.
pub trait StreamTransport: Send + Sync {
    /// Tear down any current connection and start a new one authenticated
    /// with `credential`.
    fn connect(&self, credential: &Credential);

    /// Fire-and-forget send. A no-op (with a warning) when not connected;
    /// nothing is queued.
    fn send(&self, action: &OutboundAction);

    /// Close the current connection. Idempotent.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
