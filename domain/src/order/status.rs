//! Order status value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of an order.
///
/// Statuses only move forward; [`rank`](Self::rank) gives the ordering used
/// to reject regressions when adopting snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    Pending,
    /// Paid; the session is under way.
    Confirmed,
    ProphetDone,
    CustomerDone,
    /// Both sides have marked the session done. Terminal.
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::ProphetDone => "PROPHET_DONE",
            OrderStatus::CustomerDone => "CUSTOMER_DONE",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// Position in the lifecycle. The two half-done statuses share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::ProphetDone | OrderStatus::CustomerDone => 2,
            OrderStatus::Completed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Whether moving from `self` to `next` would go backwards.
    pub fn regresses_to(&self, next: OrderStatus) -> bool {
        next.rank() < self.rank()
    }

    /// Label for display, e.g. `PROPHET DONE`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PROPHET_DONE" => Ok(OrderStatus::ProphetDone),
            "CUSTOMER_DONE" => Ok(OrderStatus::CustomerDone),
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(DomainError::UnknownOrderStatus(other.to_string())),
        }
    }
}
