//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod chat_api;
pub mod credential_provider;
pub mod order_api;
pub mod session_listener;
pub mod stream_transport;
