//! Session listener port
//!
//! Callbacks the orchestrator fires as the session changes, so a
//! presentation layer can redraw without polling.

use horo_domain::{ChatMessage, OrderSummary, RoomId};

/// Observer of session changes. Every method has a no-op default.
pub trait SessionListener: Send + Sync {
    fn on_connection_changed(&self, _connected: bool) {}

    /// A live message was appended to the active room's timeline.
    fn on_message(&self, _message: &ChatMessage) {}

    /// History for `room_id` was adopted.
    fn on_history_loaded(&self, _room_id: &RoomId, _count: usize) {}

    /// A new order snapshot was adopted for `room_id`.
    fn on_order_changed(&self, _room_id: &RoomId, _order: &OrderSummary) {}

    fn on_error(&self, _room_id: Option<&RoomId>, _error: &str) {}
}

/// No-op listener for when nothing observes the session
pub struct NoSessionListener;

impl SessionListener for NoSessionListener {}
