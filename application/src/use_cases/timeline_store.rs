//! Room timeline store.
//!
//! Holds one [`RoomTimeline`] per *active* room. A room becomes active when
//! the session selects it and inactive when the session moves away, at which
//! point its timeline is discarded.
//!
//! Each activation gets an epoch. A history fetch captures the epoch before
//! it awaits and only adopts its result if the same activation is still
//! current, so a response for an abandoned room (or an older activation of
//! the same room) never lands in the live store.

use crate::ports::chat_api::{ApiError, ChatApi};
use horo_domain::{AppendOutcome, ChatMessage, RoomId, RoomTimeline};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};

/// Result of [`RoomTimelineStore::load_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLoad {
    /// History was fetched and adopted; `count` entries after filtering.
    Adopted { count: usize },
    /// The room already had history for this activation; nothing fetched.
    AlreadyLoaded,
    /// The room was left (or re-entered) while the fetch was in flight.
    Discarded,
}

struct ActiveTimeline {
    epoch: u64,
    timeline: RoomTimeline,
}

/// Per-room merge of REST history and live stream messages.
pub struct RoomTimelineStore {
    chat_api: Arc<dyn ChatApi>,
    epochs: AtomicU64,
    rooms: Mutex<HashMap<RoomId, ActiveTimeline>>,
}

impl RoomTimelineStore {
    pub fn new(chat_api: Arc<dyn ChatApi>) -> Self {
        Self {
            chat_api,
            epochs: AtomicU64::new(0),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RoomId, ActiveTimeline>> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start collecting messages for `room_id`.
    ///
    /// Returns `false` if the room was already active (its timeline is kept).
    pub fn activate(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.lock();
        if rooms.contains_key(room_id) {
            return false;
        }
        let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
        rooms.insert(
            room_id.clone(),
            ActiveTimeline {
                epoch,
                timeline: RoomTimeline::new(room_id.clone()),
            },
        );
        debug!("Activated timeline for room {} (epoch {})", room_id, epoch);
        true
    }

    /// Stop collecting messages for `room_id` and drop its timeline.
    pub fn deactivate(&self, room_id: &RoomId) {
        if self.lock().remove(room_id).is_some() {
            debug!("Discarded timeline for room {}", room_id);
        }
    }

    pub fn is_active(&self, room_id: &RoomId) -> bool {
        self.lock().contains_key(room_id)
    }

    /// Fetch the room's stored history and adopt it.
    ///
    /// History is adopted at most once per activation. A failed fetch leaves
    /// the room without history, so a later call retries.
    pub async fn load_history(&self, room_id: &RoomId) -> Result<HistoryLoad, ApiError> {
        let epoch = {
            let rooms = self.lock();
            match rooms.get(room_id) {
                None => return Ok(HistoryLoad::Discarded),
                Some(active) if active.timeline.has_history() => {
                    return Ok(HistoryLoad::AlreadyLoaded);
                }
                Some(active) => active.epoch,
            }
        };

        let messages = self.chat_api.fetch_history(room_id).await.inspect_err(|e| {
            warn!("History fetch for room {} failed: {}", room_id, e);
        })?;

        let mut rooms = self.lock();
        let Some(active) = rooms.get_mut(room_id).filter(|a| a.epoch == epoch) else {
            debug!("Discarding history for room {}: no longer active", room_id);
            return Ok(HistoryLoad::Discarded);
        };
        if !active.timeline.set_history(messages) {
            return Ok(HistoryLoad::AlreadyLoaded);
        }
        let count = active.timeline.history_len();
        info!("Loaded {} history message(s) for room {}", count, room_id);
        Ok(HistoryLoad::Adopted { count })
    }

    /// Offer a decoded live message. Returns `true` if it was appended.
    ///
    /// Messages for rooms that are not active are ignored.
    pub fn append_live(&self, message: ChatMessage) -> bool {
        let mut rooms = self.lock();
        let Some(active) = rooms.get_mut(message.room_id()) else {
            trace!(
                "Ignoring message {} for inactive room {}",
                message.message_id(),
                message.room_id()
            );
            return false;
        };
        match active.timeline.append_live(message) {
            AppendOutcome::Appended => true,
            AppendOutcome::Duplicate => {
                trace!("Ignoring duplicate live message");
                false
            }
            AppendOutcome::WrongRoom => false,
        }
    }

    /// The merged timeline for `room_id`; empty when the room is not active.
    pub fn timeline(&self, room_id: &RoomId) -> Arc<[ChatMessage]> {
        let mut rooms = self.lock();
        match rooms.get_mut(room_id) {
            Some(active) => active.timeline.view(),
            None => Arc::from(Vec::new()),
        }
    }
}
