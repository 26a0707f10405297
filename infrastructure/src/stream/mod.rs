//! Streaming connection adapter
//!
//! Implements the [`StreamTransport`](horo_application::StreamTransport)
//! port over a WebSocket, with the JSON wire protocol in [`protocol`].

pub mod connection;
pub mod error;
pub mod protocol;

pub use connection::WebSocketTransport;
pub use error::StreamError;
