//! Wire protocol for the chat stream.
//!
//! # Outbound
//!
//! - `JoinRoom` → `{"action":"join_room","roomId":"…"}`
//! - `SendText` → `{"action":"message","type":"text","roomId":"…","senderId":"…","content":"…"}`
//!
//! # Inbound
//!
//! Every frame is a JSON object discriminated by `type`:
//!
//! - `text`: `messageId`, `roomId`, `senderId`, `content` and an RFC 3339
//!   `createdAt` are all required.
//! - `notification`: `roomId` and a known `trigger` are required. The
//!   trigger-specific payload rides in `messageDetail`. A missing
//!   `messageId` is replaced by a synthetic one and a missing `senderId`
//!   by `"system"`.
//!
//! Anything else decodes to `None`. Decoding never panics.

use chrono::{DateTime, Utc};
use horo_domain::{
    ChatMessage, MessageId, NotificationDetail, NotificationMessage, OutboundAction,
    SYSTEM_SENDER, TextMessage, Trigger,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outbound frame as serialized on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: &'a str,
    },
    Message {
        #[serde(rename = "type")]
        kind: &'static str,
        #[serde(rename = "roomId")]
        room_id: &'a str,
        #[serde(rename = "senderId")]
        sender_id: &'a str,
        content: &'a str,
    },
}

impl<'a> From<&'a OutboundAction> for OutboundFrame<'a> {
    fn from(action: &'a OutboundAction) -> Self {
        match action {
            OutboundAction::JoinRoom { room_id } => OutboundFrame::JoinRoom {
                room_id: room_id.as_str(),
            },
            OutboundAction::SendText {
                room_id,
                sender_id,
                content,
            } => OutboundFrame::Message {
                kind: "text",
                room_id: room_id.as_str(),
                sender_id: sender_id.as_str(),
                content,
            },
        }
    }
}

/// Serialize an outbound action to its wire frame.
pub fn encode(action: &OutboundAction) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundFrame::from(action))
}

/// Discriminant of an inbound frame.
#[derive(Debug, Deserialize)]
struct FrameHeader {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextFrame {
    message_id: Option<String>,
    room_id: Option<String>,
    sender_id: Option<String>,
    content: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotificationFrame {
    message_id: Option<String>,
    room_id: Option<String>,
    sender_id: Option<String>,
    trigger: Option<String>,
    #[serde(alias = "detail")]
    message_detail: Option<serde_json::Value>,
    created_at: Option<String>,
}

/// Decode one inbound frame. Malformed or unrecognised frames yield `None`.
pub fn decode(frame: &str) -> Option<ChatMessage> {
    let value: serde_json::Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(e) => {
            trace!("Dropping unparseable frame: {}", e);
            return None;
        }
    };
    let header = FrameHeader::deserialize(&value).ok()?;
    match header.kind.as_deref() {
        Some("text") => decode_text(value),
        Some("notification") => decode_notification(value),
        other => {
            trace!("Dropping frame with type {:?}", other);
            None
        }
    }
}

fn decode_text(value: serde_json::Value) -> Option<ChatMessage> {
    let raw: RawTextFrame = serde_json::from_value(value)
        .inspect_err(|e| trace!("Dropping malformed text frame: {}", e))
        .ok()?;
    let message = TextMessage {
        message_id: required_id(raw.message_id, "messageId")?,
        room_id: required_id(raw.room_id, "roomId")?,
        sender_id: required_id(raw.sender_id, "senderId")?,
        content: raw.content.or_else(|| missing("content"))?,
        created_at: parse_timestamp(raw.created_at.as_deref().or_else(|| missing("createdAt"))?)?,
    };
    Some(ChatMessage::Text(message))
}

fn decode_notification(value: serde_json::Value) -> Option<ChatMessage> {
    let raw: RawNotificationFrame = serde_json::from_value(value)
        .inspect_err(|e| trace!("Dropping malformed notification frame: {}", e))
        .ok()?;

    let trigger_name = raw.trigger.or_else(|| missing("trigger"))?;
    let trigger: Trigger = trigger_name
        .parse()
        .inspect_err(|_| trace!("Dropping notification with unknown trigger {}", trigger_name))
        .ok()?;

    let detail = raw
        .message_detail
        .filter(|v| !v.is_null())
        .map(serde_json::from_value::<NotificationDetail>)
        .transpose()
        .inspect_err(|e| trace!("Ignoring malformed messageDetail: {}", e))
        .unwrap_or_default()
        .unwrap_or_default();

    let message = NotificationMessage {
        message_id: raw
            .message_id
            .filter(|id| !id.is_empty())
            .map_or_else(MessageId::synthetic, MessageId::from),
        room_id: required_id(raw.room_id, "roomId")?,
        sender_id: raw
            .sender_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| SYSTEM_SENDER.to_string())
            .into(),
        trigger,
        detail,
        created_at: raw.created_at.as_deref().and_then(parse_timestamp),
    };
    Some(ChatMessage::Notification(message))
}

fn required_id<T: From<String>>(value: Option<String>, field: &'static str) -> Option<T> {
    match value {
        Some(id) if !id.is_empty() => Some(T::from(id)),
        _ => missing(field),
    }
}

fn missing<T>(field: &'static str) -> Option<T> {
    trace!("Dropping frame without {}", field);
    None
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .inspect_err(|e| trace!("Invalid timestamp {:?}: {}", raw, e))
        .ok()
}
