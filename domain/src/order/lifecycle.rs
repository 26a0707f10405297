//! Order lifecycle transitions and snapshot adoption.
//!
//! ```text
//! PENDING       --(payment completes)-->   CONFIRMED
//! CONFIRMED     --(prophet marks done)-->  CUSTOMER_DONE   (awaiting customer)
//! CONFIRMED     --(customer marks done)--> PROPHET_DONE    (awaiting prophet)
//! CUSTOMER_DONE --(prophet marks done)-->  COMPLETED
//! PROPHET_DONE  --(customer marks done)--> COMPLETED
//! ```
//!
//! The client never applies these transitions to its own copy; the server is
//! authoritative and local state only advances by adopting a fetched
//! snapshot. [`OrderStatus::apply`] predicts what a refresh should report,
//! and [`OrderStatus::reaches`] keeps adoption on the machine's edges.

use crate::order::status::OrderStatus;
use crate::order::summary::OrderSummary;

/// Something that moves an order along its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    PaymentCompleted,
    ProphetMarkedDone,
    CustomerMarkedDone,
}

impl OrderStatus {
    /// The status reached by applying `event`, or `None` if the edge does not
    /// exist.
    pub fn apply(self, event: OrderEvent) -> Option<OrderStatus> {
        use OrderEvent::*;
        use OrderStatus::*;
        match (self, event) {
            (Pending, PaymentCompleted) => Some(Confirmed),
            (Confirmed, ProphetMarkedDone) => Some(CustomerDone),
            (Confirmed, CustomerMarkedDone) => Some(ProphetDone),
            (CustomerDone, ProphetMarkedDone) => Some(Completed),
            (ProphetDone, CustomerMarkedDone) => Some(Completed),
            _ => None,
        }
    }

    /// Whether `next` is `self` or lies ahead of it along some path.
    pub fn reaches(self, next: OrderStatus) -> bool {
        self == next
            || [
                OrderEvent::PaymentCompleted,
                OrderEvent::ProphetMarkedDone,
                OrderEvent::CustomerMarkedDone,
            ]
            .into_iter()
            .filter_map(|event| self.apply(event))
            .any(|step| step.reaches(next))
    }
}

/// Outcome of offering a fetched snapshot to the adopted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionDecision {
    Adopt,
    /// A later-triggered refresh has already been adopted.
    Stale,
    /// The snapshot's status ranks below the adopted one.
    Regression,
    /// The snapshot is for a different order than the adopted one.
    OrderMismatch,
    /// The snapshot jumps between the two half-done statuses.
    Sideways,
}

impl AdoptionDecision {
    pub fn is_adopt(&self) -> bool {
        matches!(self, AdoptionDecision::Adopt)
    }
}

/// Decide whether `incoming`, fetched by the refresh holding `ticket`, may
/// replace `current` (the adopted snapshot and the ticket it was adopted
/// under).
pub fn decide_adoption(
    current: Option<(&OrderSummary, u64)>,
    incoming: &OrderSummary,
    ticket: u64,
) -> AdoptionDecision {
    let Some((adopted, adopted_ticket)) = current else {
        return AdoptionDecision::Adopt;
    };
    if adopted.order_id != incoming.order_id {
        return AdoptionDecision::OrderMismatch;
    }
    if ticket <= adopted_ticket {
        return AdoptionDecision::Stale;
    }
    if adopted.status.regresses_to(incoming.status) {
        return AdoptionDecision::Regression;
    }
    let both_done = incoming.is_customer_completed && incoming.is_prophet_completed;
    if !adopted.status.reaches(incoming.status) && !both_done {
        return AdoptionDecision::Sideways;
    }
    AdoptionDecision::Adopt
}
