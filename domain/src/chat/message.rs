//! Chat message entities.
//!
//! A room's timeline is a sequence of [`ChatMessage`]s. Both the REST history
//! endpoint and the live stream are normalised into this one shape at their
//! respective boundaries, so nothing downstream cares where a message came
//! from.

use crate::core::error::DomainError;
use crate::core::ids::{CourseId, MessageId, OrderId, PaymentId, RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sender id the chat service uses for notifications it generates itself.
pub const SYSTEM_SENDER: &str = "system";

/// Business event a notification represents.
///
/// The string forms are the routing keys shared by every backend service and
/// are wire-stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.payment.bound")]
    OrderPaymentBound,
    #[serde(rename = "order.paid")]
    OrderPaid,
    #[serde(rename = "order.completed")]
    OrderCompleted,
    #[serde(rename = "payment.created")]
    PaymentCreated,
    #[serde(rename = "payment.settled")]
    PaymentSettled,
    #[serde(rename = "payment.completed")]
    PaymentSuccess,
    #[serde(rename = "chat.message.incoming")]
    ChatMessageIncoming,
    #[serde(rename = "chat.message.outgoing")]
    ChatMessageOutgoing,
}

impl Trigger {
    pub const ALL: [Trigger; 9] = [
        Trigger::OrderCreated,
        Trigger::OrderPaymentBound,
        Trigger::OrderPaid,
        Trigger::OrderCompleted,
        Trigger::PaymentCreated,
        Trigger::PaymentSettled,
        Trigger::PaymentSuccess,
        Trigger::ChatMessageIncoming,
        Trigger::ChatMessageOutgoing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::OrderCreated => "order.created",
            Trigger::OrderPaymentBound => "order.payment.bound",
            Trigger::OrderPaid => "order.paid",
            Trigger::OrderCompleted => "order.completed",
            Trigger::PaymentCreated => "payment.created",
            Trigger::PaymentSettled => "payment.settled",
            Trigger::PaymentSuccess => "payment.completed",
            Trigger::ChatMessageIncoming => "chat.message.incoming",
            Trigger::ChatMessageOutgoing => "chat.message.outgoing",
        }
    }

    /// Whether a notification with this trigger means the room's order
    /// record changed on the server and should be re-fetched.
    pub fn requires_order_refresh(&self) -> bool {
        matches!(
            self,
            Trigger::OrderPaymentBound | Trigger::OrderPaid | Trigger::OrderCompleted
        )
    }

    /// Whether the notification may carry an updated order amount.
    pub fn carries_amount(&self) -> bool {
        matches!(self, Trigger::OrderPaymentBound | Trigger::OrderPaid)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTrigger(s.to_string()))
    }
}

/// Trigger-specific payload of a notification.
///
/// Different triggers fill different subsets of these fields, so all of them
/// are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationDetail {
    pub order_id: Option<OrderId>,
    pub payment_id: Option<PaymentId>,
    pub room_id: Option<RoomId>,
    pub customer_id: Option<UserId>,
    pub course_id: Option<CourseId>,
    pub course_name: Option<String>,
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
    pub amount: Option<f64>,
    /// Human-readable text, present on notifications replayed from history.
    pub summary: Option<String>,
}

/// A plain chat message typed by one of the participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A system notification about an order or payment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub trigger: Trigger,
    #[serde(rename = "messageDetail")]
    pub detail: NotificationDetail,
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry of a room timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatMessage {
    Text(TextMessage),
    Notification(NotificationMessage),
}

impl ChatMessage {
    pub fn message_id(&self) -> &MessageId {
        match self {
            ChatMessage::Text(m) => &m.message_id,
            ChatMessage::Notification(m) => &m.message_id,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            ChatMessage::Text(m) => &m.room_id,
            ChatMessage::Notification(m) => &m.room_id,
        }
    }

    pub fn sender_id(&self) -> &UserId {
        match self {
            ChatMessage::Text(m) => &m.sender_id,
            ChatMessage::Notification(m) => &m.sender_id,
        }
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        match self {
            ChatMessage::Text(m) => Some(&m.created_at),
            ChatMessage::Notification(m) => m.created_at.as_ref(),
        }
    }

    /// The notification payload, if this is a notification.
    pub fn as_notification(&self) -> Option<&NotificationMessage> {
        match self {
            ChatMessage::Notification(n) => Some(n),
            ChatMessage::Text(_) => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, ChatMessage::Notification(_))
    }
}
