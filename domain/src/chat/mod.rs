//! Chat domain.
//!
//! - [`message::ChatMessage`]: a text message or an order/payment notification
//! - [`room::ChatRoom`]: a customer/prophet channel tied to one course
//! - [`timeline::RoomTimeline`]: history + live merge for one room
//! - [`outbound::OutboundAction`]: frames the client sends on the stream

pub mod message;
pub mod outbound;
pub mod room;
pub mod timeline;
