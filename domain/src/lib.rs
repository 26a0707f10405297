//! Domain layer for horo
//!
//! This crate contains the entities, value objects and pure rules of the
//! session synchronization engine. It has no dependencies on infrastructure
//! or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Room timeline
//!
//! A room's messages come from two sources: a one-shot REST history fetch
//! and the live stream. [`RoomTimeline`] merges them into one ordered,
//! deduplicated sequence (`history ++ live`) and memoizes the merge.
//!
//! ## Order lifecycle
//!
//! Each room has at most one order. Its [`OrderStatus`] only moves forward;
//! the client adopts server snapshots through [`decide_adoption`] and never
//! advances status on its own. What a participant may do next is decided by
//! [`permitted_actions`], a pure function of role, status and completion
//! flags.

pub mod auth;
pub mod chat;
pub mod core;
pub mod order;

// Re-export commonly used types
pub use auth::credential::Credential;
pub use chat::{
    message::{
        ChatMessage, NotificationDetail, NotificationMessage, SYSTEM_SENDER, TextMessage, Trigger,
    },
    outbound::OutboundAction,
    room::ChatRoom,
    timeline::{AppendOutcome, RoomTimeline, TimelineKey},
};
pub use core::{
    error::DomainError,
    ids::{CourseId, MessageId, OrderId, PaymentId, RoomId, UserId},
    role::Role,
};
pub use order::{
    gating::{
        Awaiting, GateInput, OrderAction, awaiting, is_permitted, permitted_actions,
        permitted_actions_for,
    },
    lifecycle::{AdoptionDecision, OrderEvent, decide_adoption},
    review::Review,
    status::OrderStatus,
    summary::OrderSummary,
};
