//! Application layer for horo
//!
//! This crate contains the session use cases and the port definitions their
//! adapters implement. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ReconnectPolicy, SessionParams};
pub use ports::{
    chat_api::{ApiError, ChatApi},
    credential_provider::{CredentialError, CredentialProvider},
    order_api::OrderApi,
    session_listener::{NoSessionListener, SessionListener},
    stream_transport::{
        StreamTransport, TransportError, TransportEvent, TransportEventReceiver,
        TransportEventSender, transport_channel,
    },
};
pub use use_cases::order_sync::{
    OrderLifecycleSynchronizer, RefreshOutcome, RefreshTicket, SubmitOutcome, SyncError,
};
pub use use_cases::session::{SessionError, SessionOrchestrator, SessionView};
pub use use_cases::timeline_store::{HistoryLoad, RoomTimelineStore};
