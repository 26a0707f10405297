//! Session orchestrator.
//!
//! Owns the one stream connection of a session and wires it to the timeline
//! store and the order synchronizer:
//!
//! - **Room selection**: activate the room's timeline (discarding the
//!   previous room's), send `JoinRoom`, load history and fetch the order.
//! - **Inbound frames**: append to the timeline; order notifications for a
//!   known room spawn a refresh so the live path never waits on REST.
//! - **Connected**: re-join the active room and refresh its order, covering
//!   anything missed while disconnected.
//! - **Credential rotation**: tear the connection down and dial again with
//!   the new credential.
//!
//! [`SessionOrchestrator::run`] drives all of this from one event loop.

use crate::config::SessionParams;
use crate::ports::chat_api::{ApiError, ChatApi};
use crate::ports::order_api::OrderApi;
use crate::ports::session_listener::{NoSessionListener, SessionListener};
use crate::ports::stream_transport::{StreamTransport, TransportEvent, TransportEventReceiver};
use crate::use_cases::order_sync::{
    OrderLifecycleSynchronizer, RefreshOutcome, RefreshTicket, SubmitOutcome, SyncError,
};
use crate::use_cases::timeline_store::{HistoryLoad, RoomTimelineStore};
use chrono::Utc;
use horo_domain::{
    Awaiting, ChatMessage, ChatRoom, Credential, OrderAction, OrderSummary, OutboundAction,
    PaymentId, Review, Role, RoomId, awaiting,
};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No room selected")]
    NoActiveRoom,

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Not connected")]
    NotConnected,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<ApiError> for SessionError {
    fn from(error: ApiError) -> Self {
        SessionError::Sync(SyncError::Api(error))
    }
}

/// Snapshot of everything the presentation layer shows.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub room_id: Option<RoomId>,
    /// Room metadata, when the room list has been fetched.
    pub room: Option<ChatRoom>,
    pub role: Role,
    pub connected: bool,
    pub timeline: Arc<[ChatMessage]>,
    pub order: Option<OrderSummary>,
    pub permitted: Vec<OrderAction>,
    pub awaiting: Awaiting,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    active_room: Option<RoomId>,
    rooms: HashMap<RoomId, ChatRoom>,
    last_error: Option<String>,
}

/// Per-session wiring of transport, timelines and order state.
pub struct SessionOrchestrator {
    params: SessionParams,
    transport: Arc<dyn StreamTransport>,
    chat_api: Arc<dyn ChatApi>,
    timelines: Arc<RoomTimelineStore>,
    orders: Arc<OrderLifecycleSynchronizer>,
    listener: Arc<dyn SessionListener>,
    state: Mutex<SessionState>,
}

impl SessionOrchestrator {
    pub fn new(
        params: SessionParams,
        transport: Arc<dyn StreamTransport>,
        chat_api: Arc<dyn ChatApi>,
        order_api: Arc<dyn OrderApi>,
    ) -> Self {
        let timelines = Arc::new(RoomTimelineStore::new(chat_api.clone()));
        let orders = Arc::new(OrderLifecycleSynchronizer::new(
            order_api,
            params.role,
            params.user_id.clone(),
        ));
        Self {
            params,
            transport,
            chat_api,
            timelines,
            orders,
            listener: Arc::new(NoSessionListener),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn role(&self) -> Role {
        self.params.role
    }

    pub fn active_room(&self) -> Option<RoomId> {
        self.lock().active_room.clone()
    }

    fn require_room(&self) -> Result<RoomId, SessionError> {
        self.active_room().ok_or(SessionError::NoActiveRoom)
    }

    // ==================== Rooms ====================

    /// List the user's rooms and remember their metadata.
    pub async fn rooms(&self) -> Result<Vec<ChatRoom>, SessionError> {
        let rooms = self.chat_api.list_rooms().await.inspect_err(|e| {
            self.record_error(None, &e.to_string());
        })?;
        let mut state = self.lock();
        state.rooms = rooms.iter().map(|r| (r.id.clone(), r.clone())).collect();
        debug!("Fetched {} room(s)", rooms.len());
        Ok(rooms)
    }

    /// Make `room_id` the active room.
    ///
    /// The previous room's timeline is discarded (no leave frame is sent).
    /// History and the order are fetched concurrently; both are attempted
    /// even if one fails, and the first failure is returned.
    pub async fn select_room(&self, room_id: &RoomId) -> Result<(), SessionError> {
        let previous = self.lock().active_room.replace(room_id.clone());
        if let Some(previous) = previous.filter(|p| p != room_id) {
            self.timelines.deactivate(&previous);
        }
        self.timelines.activate(room_id);
        info!("Selected room {}", room_id);

        if self.transport.is_connected() {
            self.transport.send(&OutboundAction::join_room(room_id.clone()));
        }

        let (history, order) = tokio::join!(
            self.timelines.load_history(room_id),
            self.orders.refresh(room_id)
        );

        let mut first_error: Option<SessionError> = None;
        match history {
            Ok(HistoryLoad::Adopted { count }) => {
                self.listener.on_history_loaded(room_id, count);
            }
            Ok(_) => {}
            Err(e) => {
                self.record_error(Some(room_id), &e.to_string());
                first_error.get_or_insert(e.into());
            }
        }
        match order {
            Ok(RefreshOutcome::Adopted(order)) => self.listener.on_order_changed(room_id, &order),
            Ok(_) => {}
            Err(e) => {
                self.listener.on_error(Some(room_id), &e.to_string());
                first_error.get_or_insert(e.into());
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ==================== Chat ====================

    /// Send a text message to the active room.
    pub fn send_text(&self, content: &str) -> Result<(), SessionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let room_id = self.require_room()?;
        if !self.transport.is_connected() {
            warn!("Dropping message for room {}: not connected", room_id);
            return Err(SessionError::NotConnected);
        }
        self.transport.send(&OutboundAction::send_text(
            room_id,
            self.params.user_id.clone(),
            content,
        ));
        Ok(())
    }

    // ==================== Order actions ====================

    pub async fn create_order(&self) -> Result<OrderSummary, SessionError> {
        let room_id = self.require_room()?;
        let course_id = self.lock().rooms.get(&room_id).map(|r| r.course_id.clone());
        let course_id = match course_id {
            Some(id) => id,
            None => self
                .rooms()
                .await?
                .into_iter()
                .find(|r| r.id == room_id)
                .map(|r| r.course_id)
                .ok_or_else(|| SessionError::UnknownRoom(room_id.clone()))?,
        };
        let created = self
            .orders
            .create_order(&room_id, &course_id)
            .await
            .inspect_err(|e| self.listener.on_error(Some(&room_id), &e.to_string()))?;
        self.listener.on_order_changed(&room_id, &created);
        Ok(created)
    }

    pub async fn pay(&self) -> Result<PaymentId, SessionError> {
        let room_id = self.require_room()?;
        Ok(self
            .orders
            .pay(&room_id)
            .await
            .inspect_err(|e| self.listener.on_error(Some(&room_id), &e.to_string()))?)
    }

    /// Mark the local user's side done, then refresh to pick up the server's
    /// updated flags.
    pub async fn mark_done(&self) -> Result<SubmitOutcome, SessionError> {
        let room_id = self.require_room()?;
        let outcome = self
            .orders
            .mark_done(&room_id)
            .await
            .inspect_err(|e| self.listener.on_error(Some(&room_id), &e.to_string()))?;
        if outcome == SubmitOutcome::Submitted {
            let ticket = self.orders.next_ticket();
            refresh_and_notify(&self.orders, self.listener.as_ref(), &room_id, ticket).await;
        }
        Ok(outcome)
    }

    pub async fn submit_review(&self, review: &Review) -> Result<SubmitOutcome, SessionError> {
        let room_id = self.require_room()?;
        Ok(self
            .orders
            .submit_review(&room_id, review)
            .await
            .inspect_err(|e| self.listener.on_error(Some(&room_id), &e.to_string()))?)
    }

    /// Re-fetch the active room's order.
    pub async fn refresh_order(&self) -> Result<Option<OrderSummary>, SessionError> {
        let room_id = self.require_room()?;
        if let RefreshOutcome::Adopted(order) = self.orders.refresh(&room_id).await? {
            self.listener.on_order_changed(&room_id, &order);
        }
        Ok(self.orders.order(&room_id))
    }

    // ==================== View ====================

    pub fn view(&self) -> SessionView {
        let (room_id, room, session_error) = {
            let state = self.lock();
            let room = state
                .active_room
                .as_ref()
                .and_then(|id| state.rooms.get(id).cloned());
            (state.active_room.clone(), room, state.last_error.clone())
        };

        let (timeline, order, permitted, last_error) = match &room_id {
            Some(id) => (
                self.timelines.timeline(id),
                self.orders.order(id),
                self.orders.permitted_actions(id),
                self.orders.last_error(id).or(session_error),
            ),
            None => (Arc::from(Vec::new()), None, Vec::new(), session_error),
        };
        let waiting_on = match &room_id {
            Some(_) if permitted.is_empty() => awaiting(self.params.role, order.as_ref()),
            _ => Awaiting::Nothing,
        };

        SessionView {
            room_id,
            room,
            role: self.params.role,
            connected: self.transport.is_connected(),
            timeline,
            order,
            permitted,
            awaiting: waiting_on,
            last_error,
        }
    }

    // ==================== Events ====================

    /// React to one transport event.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("Stream connected");
                self.listener.on_connection_changed(true);
                if let Some(room_id) = self.active_room() {
                    self.transport.send(&OutboundAction::join_room(room_id.clone()));
                    self.spawn_refresh(room_id);
                }
            }
            TransportEvent::Disconnected { reason } => {
                info!("Stream disconnected: {}", reason);
                self.listener.on_connection_changed(false);
            }
            TransportEvent::Failed(error) => {
                warn!("Stream failed: {}", error);
                self.record_error(None, &error.to_string());
                self.listener.on_connection_changed(false);
            }
            TransportEvent::Frame(message) => self.handle_frame(message),
        }
    }

    fn handle_frame(&self, message: ChatMessage) {
        let refresh_room = match message.as_notification() {
            Some(n) if self.orders.apply_notification(n) => Some(n.room_id.clone()),
            _ => None,
        };

        if self.timelines.append_live(message.clone()) {
            self.listener.on_message(&message);
        }

        if let Some(room_id) = refresh_room
            && self.timelines.is_active(&room_id)
        {
            debug!("Order notification for room {}; refreshing", room_id);
            self.spawn_refresh(room_id);
        }
    }

    /// Refresh in the background. The ticket is taken now so a slower,
    /// earlier refresh cannot overwrite this one.
    fn spawn_refresh(&self, room_id: RoomId) {
        let ticket = self.orders.next_ticket();
        let orders = Arc::clone(&self.orders);
        let listener = Arc::clone(&self.listener);
        tokio::spawn(async move {
            refresh_and_notify(&orders, listener.as_ref(), &room_id, ticket).await;
        });
    }

    fn record_error(&self, room_id: Option<&RoomId>, error: &str) {
        self.lock().last_error = Some(error.to_string());
        self.listener.on_error(room_id, error);
    }

    // ==================== Event loop ====================

    fn connect(&self, credential: Option<&Credential>) {
        let Some(credential) = credential else {
            debug!("No credential; staying disconnected");
            return;
        };
        if credential.is_expired(Utc::now()) {
            self.record_error(None, "credential expired");
            return;
        }
        self.transport.connect(credential);
    }

    /// Drive the session until `cancel` fires.
    ///
    /// Dials with the current credential, then reacts to transport events,
    /// credential rotations and (when enabled) reconnect timers.
    pub async fn run(
        &self,
        mut events: TransportEventReceiver,
        mut credentials: watch::Receiver<Option<Credential>>,
        cancel: CancellationToken,
    ) {
        let mut credential = credentials.borrow_and_update().clone();
        self.connect(credential.as_ref());

        let mut credentials_open = true;
        let mut attempt: u32 = 0;
        let mut reconnect: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session cancelled");
                    break;
                }
                changed = credentials.changed(), if credentials_open => {
                    if changed.is_err() {
                        debug!("Credential source closed");
                        credentials_open = false;
                        continue;
                    }
                    credential = credentials.borrow_and_update().clone();
                    info!("Credential rotated; reconnecting");
                    reconnect = None;
                    attempt = 0;
                    let was_connected = self.transport.is_connected();
                    self.transport.disconnect();
                    if was_connected {
                        self.listener.on_connection_changed(false);
                    }
                    self.connect(credential.as_ref());
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Transport event channel closed");
                        break;
                    };
                    match &event {
                        TransportEvent::Connected => {
                            attempt = 0;
                            reconnect = None;
                        }
                        TransportEvent::Disconnected { .. } | TransportEvent::Failed(_) => {
                            if let Some(delay) = self.params.reconnect.delay_for(attempt) {
                                debug!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);
                                attempt += 1;
                                reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                            }
                        }
                        TransportEvent::Frame(_) => {}
                    }
                    self.handle_event(event);
                }
                _ = wait_for(&mut reconnect), if reconnect.is_some() => {
                    reconnect = None;
                    self.connect(credential.as_ref());
                }
            }
        }

        self.transport.disconnect();
    }
}

/// Resolves when the reconnect timer fires; pends forever without one.
async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn refresh_and_notify(
    orders: &OrderLifecycleSynchronizer,
    listener: &dyn SessionListener,
    room_id: &RoomId,
    ticket: RefreshTicket,
) {
    match orders.refresh_with_ticket(room_id, ticket).await {
        Ok(RefreshOutcome::Adopted(order)) => listener.on_order_changed(room_id, &order),
        Ok(_) => {}
        Err(e) => listener.on_error(Some(room_id), &e.to_string()),
    }
}
