//! Order summary entity

use crate::core::ids::{CourseId, OrderId, PaymentId, RoomId, UserId};
use crate::core::role::Role;
use crate::order::status::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The client's copy of a room's order.
///
/// Only ever replaced wholesale by a freshly fetched snapshot with the same
/// [`order_id`](Self::order_id); see
/// [`decide_adoption`](crate::order::lifecycle::decide_adoption).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub room_id: RoomId,
    pub course_id: CourseId,
    pub customer_id: UserId,
    pub is_customer_completed: bool,
    pub is_prophet_completed: bool,
    pub order_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub amount: f64,
    /// Set by the order service once a payment has been bound to the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
}

impl OrderSummary {
    /// Whether `role` has already marked the session done.
    pub fn is_completed_by(&self, role: Role) -> bool {
        match role {
            Role::Customer => self.is_customer_completed,
            Role::Prophet => self.is_prophet_completed,
        }
    }

    /// Short form of the order id for display.
    pub fn short_id(&self) -> &str {
        let id = self.order_id.as_str();
        id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
    }
}
