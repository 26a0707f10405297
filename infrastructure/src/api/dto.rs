//! Wire shapes of the REST collaborators.
//!
//! The chat service serializes its Go structs without tags, so rooms and
//! history rows arrive in PascalCase. The order and payment services use
//! snake_case. Every DTO also accepts camelCase aliases.
//!
//! Most responses are wrapped as `{"data": …, "message": "…"}`;
//! [`unwrap_data`] strips the envelope when present.

use crate::stream::protocol::parse_timestamp;
use horo_domain::{
    ChatMessage, ChatRoom, MessageId, NotificationDetail, NotificationMessage, OrderStatus,
    OrderSummary, PaymentId, Review, RoomId, SYSTEM_SENDER, TextMessage, Trigger,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Take `data` out of a `{data, message}` envelope; anything else is
/// returned as is.
pub(crate) fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// A payload that is sometimes a list and sometimes a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

// ==================== Chat service ====================

/// One persisted message as returned by `GET /chat/{roomId}/messages`.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageDto {
    #[serde(rename = "ID", alias = "id", alias = "messageId")]
    id: Option<String>,
    #[serde(rename = "RoomID", alias = "roomId", alias = "room_id")]
    room_id: Option<String>,
    #[serde(rename = "SenderID", alias = "senderId", alias = "sender_id")]
    sender_id: Option<String>,
    #[serde(rename = "Content", alias = "content")]
    content: Option<String>,
    #[serde(rename = "Type", alias = "type")]
    kind: Option<String>,
    #[serde(rename = "CreatedAt", alias = "createdAt", alias = "created_at")]
    created_at: Option<String>,
}

impl MessageDto {
    /// Convert a history row into a timeline message for `room`.
    ///
    /// Rows for another room, rows without an id and text rows without a
    /// valid timestamp are dropped. Persisted notifications only keep their
    /// rendered text, so the trigger is recovered from it.
    pub(crate) fn into_message(self, room: &RoomId) -> Option<ChatMessage> {
        let room_id = match self.room_id.filter(|r| !r.is_empty()) {
            Some(r) if r != room.as_str() => {
                trace!("Dropping history row for room {} (asked for {})", r, room);
                return None;
            }
            _ => room.clone(),
        };
        let id = self.id.filter(|id| !id.is_empty())?;
        let content = self.content.unwrap_or_default();
        let sender_id = self
            .sender_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SYSTEM_SENDER.to_string());
        let created_at = self.created_at.as_deref().and_then(parse_timestamp);
        let is_notification =
            self.kind.as_deref() == Some("notification") || sender_id == SYSTEM_SENDER;

        if is_notification && let Some(trigger) = infer_trigger(&content) {
            return Some(ChatMessage::Notification(NotificationMessage {
                message_id: MessageId::new(id),
                room_id: room_id.clone(),
                sender_id: sender_id.into(),
                trigger,
                detail: NotificationDetail {
                    room_id: Some(room_id),
                    amount: extract_amount(&content),
                    summary: Some(content),
                    ..NotificationDetail::default()
                },
                created_at,
            }));
        }
        if self.kind.as_deref() == Some("notification") {
            trace!("Dropping notification row {} with unrecognised text", id);
            return None;
        }

        let Some(created_at) = created_at else {
            trace!("Dropping history row {} without a valid timestamp", id);
            return None;
        };
        Some(ChatMessage::Text(TextMessage {
            message_id: MessageId::new(id),
            room_id,
            sender_id: sender_id.into(),
            content,
            created_at,
        }))
    }
}

/// Recover the trigger of a persisted notification from its text.
fn infer_trigger(content: &str) -> Option<Trigger> {
    let lower = content.to_ascii_lowercase();
    if lower.starts_with("payment created") || lower.starts_with("successfully create payment") {
        Some(Trigger::OrderPaymentBound)
    } else if lower.starts_with("payment successful")
        || (lower.contains("order") && lower.contains(" paid"))
    {
        Some(Trigger::OrderPaid)
    } else if lower.contains("order") && lower.contains("completed") {
        Some(Trigger::OrderCompleted)
    } else if lower.starts_with("order created") || lower.contains("new order") {
        Some(Trigger::OrderCreated)
    } else {
        None
    }
}

/// `"… Amount: 250.00, …"` → `250.0`
fn extract_amount(content: &str) -> Option<f64> {
    let (_, rest) = content.split_once("Amount:")?;
    let number: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse().ok()
}

/// One entry of `GET /chat/user/rooms`.
#[derive(Debug, Deserialize)]
pub(crate) struct RoomDto {
    #[serde(rename = "ID", alias = "id")]
    id: String,
    #[serde(rename = "ProphetID", alias = "prophetId", default)]
    prophet_id: String,
    #[serde(rename = "CustomerID", alias = "customerId", default)]
    customer_id: String,
    #[serde(rename = "CourseID", alias = "courseId", default)]
    course_id: String,
    #[serde(rename = "CreatedAt", alias = "createdAt", default)]
    created_at: Option<String>,
    #[serde(rename = "LastMessage", alias = "lastMessage", default)]
    last_message: Option<String>,
    #[serde(rename = "IsDone", alias = "isDone", default)]
    is_done: bool,
    #[serde(rename = "ProphetName", alias = "prophetName", default)]
    prophet_name: Option<String>,
    #[serde(rename = "CustomerName", alias = "customerName", default)]
    customer_name: Option<String>,
    #[serde(rename = "courseName", alias = "CourseName", default)]
    course_name: Option<String>,
}

impl From<RoomDto> for ChatRoom {
    fn from(dto: RoomDto) -> Self {
        ChatRoom {
            id: dto.id.into(),
            prophet_id: dto.prophet_id.into(),
            customer_id: dto.customer_id.into(),
            course_id: dto.course_id.into(),
            created_at: dto.created_at.as_deref().and_then(parse_timestamp),
            last_message: dto.last_message.unwrap_or_default(),
            is_done: dto.is_done,
            prophet_name: dto.prophet_name,
            customer_name: dto.customer_name,
            course_name: dto.course_name,
        }
    }
}

// ==================== Order and payment services ====================

#[derive(Debug, Deserialize)]
pub(crate) struct OrderDto {
    #[serde(alias = "orderId", alias = "id", alias = "ID")]
    order_id: String,
    #[serde(alias = "roomId", default)]
    room_id: Option<String>,
    #[serde(alias = "courseId", default)]
    course_id: Option<String>,
    #[serde(alias = "customerId", default)]
    customer_id: Option<String>,
    #[serde(alias = "isCustomerCompleted", default)]
    is_customer_completed: bool,
    #[serde(alias = "isProphetCompleted", default)]
    is_prophet_completed: bool,
    #[serde(alias = "orderDate", default)]
    order_date: Option<String>,
    status: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(alias = "paymentId", default)]
    payment_id: Option<String>,
}

impl OrderDto {
    /// Convert to a snapshot. `room` fills in a missing room id.
    pub(crate) fn into_summary(self, room: &RoomId) -> Result<OrderSummary, String> {
        let status: OrderStatus = self.status.parse().map_err(|e| format!("{e}"))?;
        Ok(OrderSummary {
            order_id: self.order_id.into(),
            room_id: self
                .room_id
                .filter(|r| !r.is_empty())
                .map_or_else(|| room.clone(), RoomId::from),
            course_id: self.course_id.unwrap_or_default().into(),
            customer_id: self.customer_id.unwrap_or_default().into(),
            is_customer_completed: self.is_customer_completed,
            is_prophet_completed: self.is_prophet_completed,
            order_date: self.order_date.as_deref().and_then(parse_timestamp),
            status,
            amount: self.amount.unwrap_or_default(),
            payment_id: self
                .payment_id
                .filter(|p| !p.is_empty())
                .map(PaymentId::from),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentDto {
    #[serde(alias = "paymentId", alias = "id", alias = "ID")]
    pub(crate) payment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderRequest<'a> {
    pub(crate) course_id: &'a str,
    pub(crate) room_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewRequest<'a> {
    pub(crate) customer_id: &'a str,
    pub(crate) customername: &'a str,
    pub(crate) score: u8,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
}

impl<'a> ReviewRequest<'a> {
    pub(crate) fn new(customer_id: &'a str, customer_name: &'a str, review: &'a Review) -> Self {
        Self {
            customer_id,
            customername: customer_name,
            score: review.score(),
            title: review.title(),
            description: review.description(),
        }
    }
}
