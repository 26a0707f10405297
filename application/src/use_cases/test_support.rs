//! Scripted port implementations shared by the use case tests.

use crate::ports::chat_api::{ApiError, ChatApi};
use crate::ports::order_api::OrderApi;
use crate::ports::session_listener::SessionListener;
use crate::ports::stream_transport::{StreamTransport, TransportEvent, TransportEventSender};
use async_trait::async_trait;
use chrono::Utc;
use horo_domain::{
    ChatMessage, ChatRoom, CourseId, Credential, MessageId, NotificationDetail,
    NotificationMessage, OrderId, OrderStatus, OrderSummary, OutboundAction, PaymentId, Review,
    RoomId, TextMessage, Trigger, UserId,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub const ORDER_ID: &str = "7a230ed4-b2d9-4004-b86e-ffb5da9c4e93";

pub fn text(id: &str, room: &str) -> ChatMessage {
    ChatMessage::Text(TextMessage {
        message_id: id.into(),
        room_id: room.into(),
        sender_id: "u1".into(),
        content: format!("msg {id}"),
        created_at: Utc::now(),
    })
}

pub fn notification(room: &str, trigger: Trigger, amount: Option<f64>) -> ChatMessage {
    ChatMessage::Notification(NotificationMessage {
        message_id: MessageId::synthetic(),
        room_id: room.into(),
        sender_id: "system".into(),
        trigger,
        detail: NotificationDetail {
            order_id: Some(ORDER_ID.into()),
            amount,
            ..Default::default()
        },
        created_at: None,
    })
}

pub fn order(status: OrderStatus, customer_done: bool, prophet_done: bool) -> OrderSummary {
    OrderSummary {
        order_id: ORDER_ID.into(),
        room_id: "r1".into(),
        course_id: "COURSE-1".into(),
        customer_id: "c1".into(),
        is_customer_completed: customer_done,
        is_prophet_completed: prophet_done,
        order_date: None,
        status,
        amount: 500.0,
        payment_id: None,
    }
}

pub fn room(id: &str) -> ChatRoom {
    ChatRoom {
        id: id.into(),
        prophet_id: "p1".into(),
        customer_id: "c1".into(),
        course_id: "COURSE-1".into(),
        created_at: None,
        last_message: String::new(),
        is_done: false,
        prophet_name: Some("Madame Oracle".to_string()),
        customer_name: None,
        course_name: Some("Tarot 101".to_string()),
    }
}

// ==================== Chat API ====================

type HistoryResponse = (Option<oneshot::Receiver<()>>, Result<Vec<ChatMessage>, ApiError>);

/// Chat API returning scripted history responses in order.
pub struct ScriptedChatApi {
    histories: Mutex<VecDeque<HistoryResponse>>,
    rooms: Mutex<Vec<ChatRoom>>,
    history_calls: AtomicUsize,
}

impl ScriptedChatApi {
    pub fn new() -> Self {
        Self {
            histories: Mutex::new(VecDeque::new()),
            rooms: Mutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_history(&self, response: Result<Vec<ChatMessage>, ApiError>) {
        self.histories.lock().unwrap().push_back((None, response));
    }

    /// Queue a response that is only returned once the sender fires.
    pub fn push_gated_history(
        &self,
        response: Result<Vec<ChatMessage>, ApiError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.histories.lock().unwrap().push_back((Some(rx), response));
        tx
    }

    pub fn set_rooms(&self, rooms: Vec<ChatRoom>) {
        *self.rooms.lock().unwrap() = rooms;
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for ScriptedChatApi {
    async fn fetch_history(&self, _room_id: &RoomId) -> Result<Vec<ChatMessage>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.histories.lock().unwrap().pop_front();
        match next {
            Some((gate, response)) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                response
            }
            None => Ok(Vec::new()),
        }
    }

    async fn list_rooms(&self) -> Result<Vec<ChatRoom>, ApiError> {
        Ok(self.rooms.lock().unwrap().clone())
    }
}

// ==================== Order API ====================

/// Order API with scripted fetch responses and a call log.
///
/// When the fetch queue is empty, `fetch_by_room` returns the current
/// `server` order.
pub struct ScriptedOrderApi {
    fetches: Mutex<VecDeque<Result<Option<OrderSummary>, ApiError>>>,
    server: Mutex<Option<OrderSummary>>,
    payment_lookup: Mutex<Option<PaymentId>>,
    fail_actions: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOrderApi {
    pub fn new() -> Self {
        Self {
            fetches: Mutex::new(VecDeque::new()),
            server: Mutex::new(None),
            payment_lookup: Mutex::new(None),
            fail_actions: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_fetch(&self, response: Result<Option<OrderSummary>, ApiError>) {
        self.fetches.lock().unwrap().push_back(response);
    }

    pub fn set_server(&self, order: Option<OrderSummary>) {
        *self.server.lock().unwrap() = order;
    }

    pub fn set_payment_lookup(&self, payment: Option<&str>) {
        *self.payment_lookup.lock().unwrap() = payment.map(PaymentId::from);
    }

    pub fn fail_actions_with(&self, error: ApiError) {
        *self.fail_actions.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_actions.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderApi for ScriptedOrderApi {
    async fn fetch_by_room(&self, room_id: &RoomId) -> Result<Option<OrderSummary>, ApiError> {
        self.calls.lock().unwrap().push(format!("fetch:{room_id}"));
        let next = self.fetches.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => Ok(self.server.lock().unwrap().clone()),
        }
    }

    async fn create(
        &self,
        course_id: &CourseId,
        room_id: &RoomId,
    ) -> Result<OrderSummary, ApiError> {
        self.record(format!("create:{course_id}:{room_id}"))?;
        let mut created = order(OrderStatus::Pending, false, false);
        created.room_id = room_id.clone();
        created.course_id = course_id.clone();
        *self.server.lock().unwrap() = Some(created.clone());
        Ok(created)
    }

    async fn find_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentId>, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("find_payment:{order_id}"));
        Ok(self.payment_lookup.lock().unwrap().clone())
    }

    async fn complete_payment(&self, payment_id: &PaymentId) -> Result<(), ApiError> {
        self.record(format!("complete_payment:{payment_id}"))
    }

    async fn mark_customer_completed(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.record(format!("mark_customer:{order_id}"))
    }

    async fn mark_prophet_completed(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.record(format!("mark_prophet:{order_id}"))
    }

    async fn submit_review(
        &self,
        course_id: &CourseId,
        customer_id: &UserId,
        review: &Review,
    ) -> Result<(), ApiError> {
        self.record(format!(
            "review:{course_id}:{customer_id}:{}",
            review.score()
        ))
    }
}

// ==================== Transport ====================

/// In-memory transport that records traffic and counts open connections.
pub struct FakeTransport {
    events: TransportEventSender,
    connected: AtomicBool,
    open: AtomicUsize,
    max_open: AtomicUsize,
    disconnects: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    sent: Mutex<Vec<OutboundAction>>,
}

impl FakeTransport {
    pub fn new(events: TransportEventSender) -> Self {
        Self {
            events,
            connected: AtomicBool::new(false),
            open: AtomicUsize::new(0),
            max_open: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Deliver an event as if it came off the wire.
    pub fn emit(&self, event: TransportEvent) {
        if matches!(
            event,
            TransportEvent::Disconnected { .. } | TransportEvent::Failed(_)
        ) && self.connected.swap(false, Ordering::SeqCst)
        {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
        let _ = self.events.send(event);
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutboundAction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn max_open_connections(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl StreamTransport for FakeTransport {
    fn connect(&self, credential: &Credential) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push(credential.token().to_string());
        let _ = self.events.send(TransportEvent::Connected);
    }

    fn send(&self, action: &OutboundAction) {
        if self.connected.load(Ordering::SeqCst) {
            self.sent.lock().unwrap().push(action.clone());
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ==================== Listener ====================

/// Listener that records callbacks as strings.
pub struct RecordingListener {
    pub events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionListener for RecordingListener {
    fn on_connection_changed(&self, connected: bool) {
        self.events
            .lock()
            .unwrap()
            .push(format!("connected:{connected}"));
    }

    fn on_message(&self, message: &ChatMessage) {
        self.events
            .lock()
            .unwrap()
            .push(format!("message:{}", message.message_id()));
    }

    fn on_order_changed(&self, _room_id: &RoomId, order: &OrderSummary) {
        self.events
            .lock()
            .unwrap()
            .push(format!("order:{}", order.status));
    }

    fn on_error(&self, _room_id: Option<&RoomId>, error: &str) {
        self.events.lock().unwrap().push(format!("error:{error}"));
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
