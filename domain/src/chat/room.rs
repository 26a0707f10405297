//! Chat room entity

use crate::core::ids::{CourseId, RoomId, UserId};
use crate::core::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat channel between one customer and one prophet about one course.
///
/// Rooms are created by the chat service; the client only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub prophet_id: UserId,
    pub customer_id: UserId,
    pub course_id: CourseId,
    pub created_at: Option<DateTime<Utc>>,
    pub last_message: String,
    /// Set once the room's order has reached its terminal state.
    pub is_done: bool,
    pub prophet_name: Option<String>,
    pub customer_name: Option<String>,
    pub course_name: Option<String>,
}

impl ChatRoom {
    /// Which side of this room `user` is on, if any.
    pub fn role_of(&self, user: &UserId) -> Option<Role> {
        if &self.customer_id == user {
            Some(Role::Customer)
        } else if &self.prophet_id == user {
            Some(Role::Prophet)
        } else {
            None
        }
    }

    /// The id of the other participant.
    pub fn counterpart_of(&self, user: &UserId) -> Option<&UserId> {
        match self.role_of(user)? {
            Role::Customer => Some(&self.prophet_id),
            Role::Prophet => Some(&self.customer_id),
        }
    }

    /// Display name for a participant, falling back to the raw id.
    pub fn display_name(&self, user: &UserId) -> String {
        let name = match self.role_of(user) {
            Some(Role::Customer) => self.customer_name.as_deref(),
            Some(Role::Prophet) => self.prophet_name.as_deref(),
            None => None,
        };
        name.filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| user.to_string())
    }
}
