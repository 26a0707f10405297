//! Chat API port
//!
//! Defines the REST reads the session needs from the chat service.

use async_trait::async_trait;
use horo_domain::{ChatMessage, ChatRoom, RoomId};
use thiserror::Error;

/// Errors that can occur when calling a REST collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential unavailable: {0}")]
    Credential(String),

    #[error("Timeout")]
    Timeout,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Read access to the chat service.
///
/// Implementations normalise the service's record shapes into domain types;
/// nothing upstream sees the wire field names.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Full stored history of a room, oldest first.
    async fn fetch_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, ApiError>;

    /// Rooms the authenticated user participates in.
    async fn list_rooms(&self) -> Result<Vec<ChatRoom>, ApiError>;
}
