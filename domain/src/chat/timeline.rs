//! Room timeline: history prefix + live suffix.
//!
//! ```text
//! view = history ++ (live − ids already in history)
//! ```
//!
//! - `history` is set at most once, from the REST fetch, and never changes
//!   afterwards.
//! - `live` only grows. Entries for other rooms and ids already buffered are
//!   rejected on append.
//! - The merged view is cached and keyed on [`TimelineKey`], so repeated reads
//!   between changes return the same allocation.

use crate::chat::message::ChatMessage;
use crate::core::ids::{MessageId, RoomId};
use std::collections::HashSet;
use std::sync::Arc;

/// Cache key for the merged view. Changes whenever either partition changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineKey {
    pub history_version: u64,
    pub live_len: usize,
}

/// Result of offering a live message to a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The message belongs to a different room.
    WrongRoom,
    /// A message with the same id is already in the live buffer.
    Duplicate,
}

/// One room's ordered, deduplicated message sequence.
#[derive(Debug, Clone)]
pub struct RoomTimeline {
    room_id: RoomId,
    history: Vec<ChatMessage>,
    history_ids: HashSet<MessageId>,
    history_version: u64,
    live: Vec<ChatMessage>,
    live_ids: HashSet<MessageId>,
    cache: Option<(TimelineKey, Arc<[ChatMessage]>)>,
}

impl RoomTimeline {
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: room_id.into(),
            history: Vec::new(),
            history_ids: HashSet::new(),
            history_version: 0,
            live: Vec::new(),
            live_ids: HashSet::new(),
            cache: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn has_history(&self) -> bool {
        self.history_version > 0
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Adopt the fetched history.
    ///
    /// Returns `false` (and changes nothing) if history was already adopted.
    /// Entries for other rooms and repeated ids are dropped; the first
    /// occurrence of an id wins.
    pub fn set_history(&mut self, messages: Vec<ChatMessage>) -> bool {
        if self.has_history() {
            return false;
        }
        for message in messages {
            if message.room_id() != &self.room_id {
                continue;
            }
            if self.history_ids.insert(message.message_id().clone()) {
                self.history.push(message);
            }
        }
        self.history_version += 1;
        true
    }

    /// Append a message delivered by the live stream.
    pub fn append_live(&mut self, message: ChatMessage) -> AppendOutcome {
        if message.room_id() != &self.room_id {
            return AppendOutcome::WrongRoom;
        }
        if !self.live_ids.insert(message.message_id().clone()) {
            return AppendOutcome::Duplicate;
        }
        self.live.push(message);
        AppendOutcome::Appended
    }

    pub fn key(&self) -> TimelineKey {
        TimelineKey {
            history_version: self.history_version,
            live_len: self.live.len(),
        }
    }

    /// The merged view, recomputed only when [`key`](Self::key) has changed
    /// since the last call.
    pub fn view(&mut self) -> Arc<[ChatMessage]> {
        let key = self.key();
        if let Some((cached_key, cached)) = &self.cache
            && *cached_key == key
        {
            return Arc::clone(cached);
        }

        let merged: Arc<[ChatMessage]> = self
            .history
            .iter()
            .chain(
                self.live
                    .iter()
                    .filter(|m| !self.history_ids.contains(m.message_id())),
            )
            .cloned()
            .collect::<Vec<_>>()
            .into();
        self.cache = Some((key, Arc::clone(&merged)));
        merged
    }
}
