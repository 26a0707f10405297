//! Actions the client sends over the streaming connection.

use crate::core::ids::{RoomId, UserId};

/// An outbound frame, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    /// Subscribe the connection to a room's live events.
    JoinRoom { room_id: RoomId },
    /// Post a text message to a room.
    SendText {
        room_id: RoomId,
        sender_id: UserId,
        content: String,
    },
}

impl OutboundAction {
    pub fn join_room(room_id: impl Into<RoomId>) -> Self {
        OutboundAction::JoinRoom {
            room_id: room_id.into(),
        }
    }

    pub fn send_text(
        room_id: impl Into<RoomId>,
        sender_id: impl Into<UserId>,
        content: impl Into<String>,
    ) -> Self {
        OutboundAction::SendText {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            content: content.into(),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            OutboundAction::JoinRoom { room_id } | OutboundAction::SendText { room_id, .. } => {
                room_id
            }
        }
    }
}
