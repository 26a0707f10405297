//! Order lifecycle synchronizer.
//!
//! Keeps the client's copy of each room's order in step with the order
//! service. State only advances by adopting a fetched snapshot:
//!
//! 1. Something triggers a refresh (room selected, stream connected, an
//!    order notification). A ticket is taken from a monotonic counter *at
//!    trigger time*.
//! 2. The order is fetched over REST.
//! 3. The snapshot is offered to [`decide_adoption`] together with the
//!    ticket; late results from earlier triggers, status regressions and
//!    jumps off the lifecycle's edges are rejected.
//!
//! User actions (create, pay, mark done, review) are checked against the
//! gating function before any request is made, and never modify the adopted
//! snapshot themselves.

use crate::ports::chat_api::ApiError;
use crate::ports::order_api::OrderApi;
use horo_domain::{
    AdoptionDecision, CourseId, DomainError, NotificationMessage, OrderAction, OrderEvent,
    OrderId, OrderSummary, PaymentId, Review, Role, RoomId, UserId, decide_adoption,
    permitted_actions_for,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during order operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cannot {action} as {role} (order: {state})")]
    NotPermitted {
        action: OrderAction,
        role: Role,
        state: String,
    },

    #[error("No order for room {0}")]
    NoOrder(RoomId),

    #[error("No payment bound to order {0}")]
    NoPayment(OrderId),

    #[error("Invalid input: {0}")]
    Invalid(#[from] DomainError),
}

impl SyncError {
    pub fn is_not_permitted(&self) -> bool {
        matches!(self, SyncError::NotPermitted { .. })
    }
}

/// Result of a refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The fetched snapshot replaced the adopted one.
    Adopted(OrderSummary),
    /// The snapshot was rejected; the adopted one is kept.
    Rejected(AdoptionDecision),
    /// The server reported no order and none was adopted.
    NoOrder,
    /// The server reported no order but one is adopted; it is kept.
    Kept,
}

/// Result of an idempotent submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// Already done (server flag or an earlier local submission); no request
    /// was made.
    AlreadySubmitted,
}

/// A refresh position, taken when the refresh is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug, Default)]
struct OrderSlot {
    order: Option<OrderSummary>,
    adopted_ticket: u64,
    last_error: Option<String>,
    /// Mark-done and review submissions made from this client, per order.
    submitted: HashSet<(OrderId, OrderAction)>,
}

impl OrderSlot {
    fn current(&self) -> Option<(&OrderSummary, u64)> {
        self.order.as_ref().map(|o| (o, self.adopted_ticket))
    }

    fn is_submitted(&self, action: OrderAction) -> bool {
        self.order
            .as_ref()
            .is_some_and(|o| self.submitted.contains(&(o.order_id.clone(), action)))
    }
}

/// Per-room order state and the role-gated operations on it.
pub struct OrderLifecycleSynchronizer {
    order_api: Arc<dyn OrderApi>,
    role: Role,
    user_id: UserId,
    tickets: AtomicU64,
    slots: Mutex<HashMap<RoomId, OrderSlot>>,
}

impl OrderLifecycleSynchronizer {
    pub fn new(order_api: Arc<dyn OrderApi>, role: Role, user_id: impl Into<UserId>) -> Self {
        Self {
            order_api,
            role,
            user_id: user_id.into(),
            tickets: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RoomId, OrderSlot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== Queries ====================

    /// The adopted order for `room_id`, if any.
    pub fn order(&self, room_id: &RoomId) -> Option<OrderSummary> {
        self.lock().get(room_id).and_then(|s| s.order.clone())
    }

    /// The error from the most recent failed request for `room_id`.
    pub fn last_error(&self, room_id: &RoomId) -> Option<String> {
        self.lock().get(room_id).and_then(|s| s.last_error.clone())
    }

    /// Actions the local user may take in `room_id` right now.
    ///
    /// This is the gating function over the adopted snapshot, minus anything
    /// this client has already submitted for the same order.
    pub fn permitted_actions(&self, room_id: &RoomId) -> Vec<OrderAction> {
        let slots = self.lock();
        let slot = slots.get(room_id);
        permitted_actions_for(self.role, slot.and_then(|s| s.order.as_ref()))
            .into_iter()
            .filter(|action| !slot.is_some_and(|s| s.is_submitted(*action)))
            .collect()
    }

    // ==================== Refresh ====================

    /// Take a ticket for a refresh triggered now.
    pub fn next_ticket(&self) -> RefreshTicket {
        RefreshTicket(self.tickets.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Fetch and (if newer) adopt the room's order.
    pub async fn refresh(&self, room_id: &RoomId) -> Result<RefreshOutcome, SyncError> {
        let ticket = self.next_ticket();
        self.refresh_with_ticket(room_id, ticket).await
    }

    /// Complete a refresh whose ticket was taken earlier.
    pub async fn refresh_with_ticket(
        &self,
        room_id: &RoomId,
        ticket: RefreshTicket,
    ) -> Result<RefreshOutcome, SyncError> {
        debug!("Refreshing order for room {} (ticket {})", room_id, ticket.0);
        let fetched = match self.order_api.fetch_by_room(room_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Order refresh for room {} failed: {}", room_id, e);
                self.record_error(room_id, &e);
                return Err(e.into());
            }
        };

        let mut slots = self.lock();
        let slot = slots.entry(room_id.clone()).or_default();
        slot.last_error = None;

        let Some(incoming) = fetched else {
            return Ok(if slot.order.is_some() {
                debug!("Server reported no order for room {}; keeping adopted", room_id);
                RefreshOutcome::Kept
            } else {
                RefreshOutcome::NoOrder
            });
        };

        match decide_adoption(slot.current(), &incoming, ticket.0) {
            AdoptionDecision::Adopt => {
                if slot.order.as_ref().map(|o| o.status) != Some(incoming.status) {
                    info!(
                        "Order {} in room {} is now {}",
                        incoming.short_id(),
                        room_id,
                        incoming.status
                    );
                }
                slot.order = Some(incoming.clone());
                slot.adopted_ticket = ticket.0;
                Ok(RefreshOutcome::Adopted(incoming))
            }
            decision => {
                debug!(
                    "Rejected order snapshot for room {} (ticket {}): {:?}",
                    room_id, ticket.0, decision
                );
                Ok(RefreshOutcome::Rejected(decision))
            }
        }
    }

    /// Apply what a notification says about the room's order.
    ///
    /// Updates the adopted amount when the notification carries one for the
    /// same order; never touches status. Returns whether the notification
    /// calls for a refresh.
    pub fn apply_notification(&self, notification: &NotificationMessage) -> bool {
        if notification.trigger.carries_amount()
            && let Some(amount) = notification.detail.amount
        {
            let mut slots = self.lock();
            if let Some(order) = slots
                .get_mut(&notification.room_id)
                .and_then(|s| s.order.as_mut())
                && notification
                    .detail
                    .order_id
                    .as_ref()
                    .is_none_or(|id| *id == order.order_id)
            {
                order.amount = amount;
            }
        }
        notification.trigger.requires_order_refresh()
    }

    // ==================== Actions ====================

    /// Create the room's order. Customer only, and only when the room has no
    /// order yet.
    pub async fn create_order(
        &self,
        room_id: &RoomId,
        course_id: &CourseId,
    ) -> Result<OrderSummary, SyncError> {
        self.ensure_permitted(room_id, OrderAction::CreateOrder)?;
        let ticket = self.next_ticket();
        let created = self
            .order_api
            .create(course_id, room_id)
            .await
            .inspect_err(|e| self.record_error(room_id, e))?;
        info!("Created order {} in room {}", created.short_id(), room_id);

        let mut slots = self.lock();
        let slot = slots.entry(room_id.clone()).or_default();
        if decide_adoption(slot.current(), &created, ticket.0).is_adopt() {
            slot.order = Some(created.clone());
            slot.adopted_ticket = ticket.0;
        }
        slot.last_error = None;
        Ok(created)
    }

    /// Complete payment for the room's pending order.
    ///
    /// The payment id comes from the order record, or from a lookup when the
    /// record has none. The adopted status is not changed; the confirmation
    /// arrives with the next refresh.
    pub async fn pay(&self, room_id: &RoomId) -> Result<PaymentId, SyncError> {
        let order = self
            .ensure_permitted(room_id, OrderAction::Pay)?
            .ok_or_else(|| SyncError::NoOrder(room_id.clone()))?;
        let payment_id = match order.payment_id.clone() {
            Some(id) => id,
            None => self
                .order_api
                .find_payment_for_order(&order.order_id)
                .await
                .inspect_err(|e| self.record_error(room_id, e))?
                .ok_or_else(|| SyncError::NoPayment(order.order_id.clone()))?,
        };
        self.order_api
            .complete_payment(&payment_id)
            .await
            .inspect_err(|e| self.record_error(room_id, e))?;
        debug!(
            "Expecting order {} to reach {:?}",
            order.short_id(),
            order.status.apply(OrderEvent::PaymentCompleted)
        );
        info!(
            "Submitted payment {} for order {}",
            payment_id,
            order.short_id()
        );
        Ok(payment_id)
    }

    /// Mark the session done for the local user's side.
    pub async fn mark_done(&self, room_id: &RoomId) -> Result<SubmitOutcome, SyncError> {
        match self.role {
            Role::Prophet => self.mark_prophet_done(room_id).await,
            Role::Customer => self.mark_customer_done(room_id).await,
        }
    }

    pub async fn mark_prophet_done(&self, room_id: &RoomId) -> Result<SubmitOutcome, SyncError> {
        self.submit_once(room_id, OrderAction::MarkProphetDone, Role::Prophet)
            .await
    }

    pub async fn mark_customer_done(&self, room_id: &RoomId) -> Result<SubmitOutcome, SyncError> {
        self.submit_once(room_id, OrderAction::MarkCustomerDone, Role::Customer)
            .await
    }

    /// Review the course of a completed order. At most once per order.
    pub async fn submit_review(
        &self,
        room_id: &RoomId,
        review: &Review,
    ) -> Result<SubmitOutcome, SyncError> {
        let order = {
            let mut slots = self.lock();
            let slot = slots.entry(room_id.clone()).or_default();
            if slot.is_submitted(OrderAction::WriteReview) {
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            let order = self.check(room_id, slot, OrderAction::WriteReview)?;
            slot.submitted
                .insert((order.order_id.clone(), OrderAction::WriteReview));
            order
        };

        let result = self
            .order_api
            .submit_review(&order.course_id, &self.user_id, review)
            .await;
        self.settle_submission(room_id, &order.order_id, OrderAction::WriteReview, result)?;
        info!("Submitted review for course {}", order.course_id);
        Ok(SubmitOutcome::Submitted)
    }

    async fn submit_once(
        &self,
        room_id: &RoomId,
        action: OrderAction,
        side: Role,
    ) -> Result<SubmitOutcome, SyncError> {
        let order = {
            let mut slots = self.lock();
            let slot = slots.entry(room_id.clone()).or_default();
            if self.role == side
                && let Some(order) = &slot.order
                && (order.is_completed_by(side) || slot.is_submitted(action))
            {
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            let order = self.check(room_id, slot, action)?;
            slot.submitted.insert((order.order_id.clone(), action));
            order
        };

        let result = match side {
            Role::Prophet => self.order_api.mark_prophet_completed(&order.order_id).await,
            Role::Customer => {
                self.order_api
                    .mark_customer_completed(&order.order_id)
                    .await
            }
        };
        self.settle_submission(room_id, &order.order_id, action, result)?;
        info!("Marked order {} done as {}", order.short_id(), side);
        let event = match side {
            Role::Prophet => OrderEvent::ProphetMarkedDone,
            Role::Customer => OrderEvent::CustomerMarkedDone,
        };
        debug!(
            "Expecting order {} to reach {:?}",
            order.short_id(),
            order.status.apply(event)
        );
        Ok(SubmitOutcome::Submitted)
    }

    /// Clear the local marker again when the request failed, so the user can
    /// retry.
    fn settle_submission(
        &self,
        room_id: &RoomId,
        order_id: &OrderId,
        action: OrderAction,
        result: Result<(), ApiError>,
    ) -> Result<(), SyncError> {
        let mut slots = self.lock();
        let slot = slots.entry(room_id.clone()).or_default();
        match result {
            Ok(()) => {
                slot.last_error = None;
                Ok(())
            }
            Err(e) => {
                slot.submitted.remove(&(order_id.clone(), action));
                slot.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn ensure_permitted(
        &self,
        room_id: &RoomId,
        action: OrderAction,
    ) -> Result<Option<OrderSummary>, SyncError> {
        let slots = self.lock();
        match slots.get(room_id) {
            Some(slot) => self.gate(slot, action),
            None => self.gate(&OrderSlot::default(), action),
        }
    }

    /// Gate `action` against the slot's adopted order.
    fn gate(
        &self,
        slot: &OrderSlot,
        action: OrderAction,
    ) -> Result<Option<OrderSummary>, SyncError> {
        let order = slot.order.as_ref();
        if !permitted_actions_for(self.role, order).contains(&action) {
            return Err(SyncError::NotPermitted {
                action,
                role: self.role,
                state: order.map_or_else(|| "none".to_string(), |o| o.status.to_string()),
            });
        }
        Ok(order.cloned())
    }

    /// Like [`gate`](Self::gate), for actions that need an existing order.
    fn check(
        &self,
        room_id: &RoomId,
        slot: &OrderSlot,
        action: OrderAction,
    ) -> Result<OrderSummary, SyncError> {
        self.gate(slot, action)?
            .ok_or_else(|| SyncError::NoOrder(room_id.clone()))
    }

    fn record_error(&self, room_id: &RoomId, error: &ApiError) {
        self.lock().entry(room_id.clone()).or_default().last_error = Some(error.to_string());
    }
}
