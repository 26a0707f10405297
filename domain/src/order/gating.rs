//! Action gating for the order panel.
//!
//! What a participant may do next is a pure function of
//! `(role, status, is_customer_completed, is_prophet_completed)`. Nothing
//! else (in particular, not which notification arrived last) feeds into it.
//!
//! | status | customer | prophet |
//! |--------|----------|---------|
//! | no order | CreateOrder | - |
//! | PENDING | Pay | - |
//! | CONFIRMED | MarkCustomerDone unless customer flag set | MarkProphetDone unless prophet flag set |
//! | PROPHET_DONE | MarkCustomerDone unless customer flag set | - |
//! | CUSTOMER_DONE | - | MarkProphetDone unless prophet flag set |
//! | COMPLETED | WriteReview | - |

use crate::core::role::Role;
use crate::order::status::OrderStatus;
use crate::order::summary::OrderSummary;
use serde::{Deserialize, Serialize};

/// A user-triggered order action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    CreateOrder,
    Pay,
    MarkProphetDone,
    MarkCustomerDone,
    WriteReview,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::CreateOrder => "create order",
            OrderAction::Pay => "pay order",
            OrderAction::MarkProphetDone => "mark prophet done",
            OrderAction::MarkCustomerDone => "mark customer done",
            OrderAction::WriteReview => "write review",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The gating inputs taken from an order snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateInput {
    pub status: OrderStatus,
    pub is_customer_completed: bool,
    pub is_prophet_completed: bool,
}

impl From<&OrderSummary> for GateInput {
    fn from(order: &OrderSummary) -> Self {
        Self {
            status: order.status,
            is_customer_completed: order.is_customer_completed,
            is_prophet_completed: order.is_prophet_completed,
        }
    }
}

/// Permitted actions for `role` given the gating inputs of an existing order,
/// or `None` when the room has no order yet.
pub fn permitted_actions(role: Role, input: Option<GateInput>) -> Vec<OrderAction> {
    let Some(input) = input else {
        return match role {
            Role::Customer => vec![OrderAction::CreateOrder],
            Role::Prophet => Vec::new(),
        };
    };

    match (input.status, role) {
        (OrderStatus::Pending, Role::Customer) => vec![OrderAction::Pay],
        (OrderStatus::Pending, Role::Prophet) => Vec::new(),
        (OrderStatus::Confirmed | OrderStatus::ProphetDone, Role::Customer)
            if !input.is_customer_completed =>
        {
            vec![OrderAction::MarkCustomerDone]
        }
        (OrderStatus::Confirmed | OrderStatus::CustomerDone, Role::Prophet)
            if !input.is_prophet_completed =>
        {
            vec![OrderAction::MarkProphetDone]
        }
        (OrderStatus::Completed, Role::Customer) => vec![OrderAction::WriteReview],
        _ => Vec::new(),
    }
}

/// Convenience wrapper over [`permitted_actions`] for an optional snapshot.
pub fn permitted_actions_for(role: Role, order: Option<&OrderSummary>) -> Vec<OrderAction> {
    permitted_actions(role, order.map(GateInput::from))
}

/// Whether `action` is currently permitted.
pub fn is_permitted(role: Role, order: Option<&OrderSummary>, action: OrderAction) -> bool {
    permitted_actions_for(role, order).contains(&action)
}

/// What the participant is waiting on when no action is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiting {
    /// No order yet; only the customer can create one.
    OrderCreation,
    /// Order created; only the customer can pay.
    Payment,
    /// The other side has to mark done next.
    Counterpart(Role),
    Nothing,
}

/// Describe what `role` is waiting for, for status lines.
pub fn awaiting(role: Role, order: Option<&OrderSummary>) -> Awaiting {
    if !permitted_actions_for(role, order).is_empty() {
        return Awaiting::Nothing;
    }
    match order {
        None => Awaiting::OrderCreation,
        Some(o) if o.status == OrderStatus::Pending => Awaiting::Payment,
        Some(o) if !o.status.is_terminal() => Awaiting::Counterpart(role.counterpart()),
        Some(_) => Awaiting::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::summary::fixtures::order;

    #[test]
    fn test_no_order() {
        assert_eq!(
            permitted_actions_for(Role::Customer, None),
            vec![OrderAction::CreateOrder]
        );
        assert!(permitted_actions_for(Role::Prophet, None).is_empty());
        assert_eq!(awaiting(Role::Prophet, None), Awaiting::OrderCreation);
    }

    #[test]
    fn test_pending() {
        let o = order(OrderStatus::Pending, false, false);
        assert_eq!(
            permitted_actions_for(Role::Customer, Some(&o)),
            vec![OrderAction::Pay]
        );
        assert!(permitted_actions_for(Role::Prophet, Some(&o)).is_empty());
        assert_eq!(awaiting(Role::Prophet, Some(&o)), Awaiting::Payment);
    }

    #[test]
    fn test_prophet_marks_done_then_waits() {
        let before = order(OrderStatus::Confirmed, false, false);
        assert_eq!(
            permitted_actions_for(Role::Prophet, Some(&before)),
            vec![OrderAction::MarkProphetDone]
        );

        let after = order(OrderStatus::CustomerDone, false, true);
        assert!(permitted_actions_for(Role::Prophet, Some(&after)).is_empty());
        assert_eq!(
            awaiting(Role::Prophet, Some(&after)),
            Awaiting::Counterpart(Role::Customer)
        );
    }

    #[test]
    fn test_documented_permitted_states() {
        // Prophet: CONFIRMED and CUSTOMER_DONE while the prophet flag is clear.
        for status in [OrderStatus::Confirmed, OrderStatus::CustomerDone] {
            let o = order(status, status == OrderStatus::CustomerDone, false);
            assert!(is_permitted(Role::Prophet, Some(&o), OrderAction::MarkProphetDone));
        }
        // Customer: CONFIRMED and PROPHET_DONE while the customer flag is clear.
        for status in [OrderStatus::Confirmed, OrderStatus::ProphetDone] {
            let o = order(status, false, status == OrderStatus::ProphetDone);
            assert!(is_permitted(Role::Customer, Some(&o), OrderAction::MarkCustomerDone));
        }
        // Each side is shut out of the half-done state that waits on the other.
        let o = order(OrderStatus::ProphetDone, false, false);
        assert!(permitted_actions_for(Role::Prophet, Some(&o)).is_empty());
        assert_eq!(
            awaiting(Role::Prophet, Some(&o)),
            Awaiting::Counterpart(Role::Customer)
        );
        let o = order(OrderStatus::CustomerDone, false, false);
        assert!(permitted_actions_for(Role::Customer, Some(&o)).is_empty());
        assert_eq!(
            awaiting(Role::Customer, Some(&o)),
            Awaiting::Counterpart(Role::Prophet)
        );
    }

    #[test]
    fn test_completion_flag_blocks_resubmission() {
        let o = order(OrderStatus::Confirmed, true, false);
        assert!(permitted_actions_for(Role::Customer, Some(&o)).is_empty());
        assert_eq!(
            permitted_actions_for(Role::Prophet, Some(&o)),
            vec![OrderAction::MarkProphetDone]
        );
    }

    #[test]
    fn test_completed() {
        let o = order(OrderStatus::Completed, true, true);
        assert_eq!(
            permitted_actions_for(Role::Customer, Some(&o)),
            vec![OrderAction::WriteReview]
        );
        assert!(permitted_actions_for(Role::Prophet, Some(&o)).is_empty());
        assert_eq!(awaiting(Role::Prophet, Some(&o)), Awaiting::Nothing);
    }

    #[test]
    fn test_gating_ignores_everything_but_gate_input() {
        let mut a = order(OrderStatus::Confirmed, false, false);
        let mut b = a.clone();
        a.amount = 1.0;
        b.amount = 999.0;
        b.order_id = "other".into();
        a.payment_id = Some("p1".into());
        for role in [Role::Customer, Role::Prophet] {
            assert_eq!(
                permitted_actions_for(role, Some(&a)),
                permitted_actions_for(role, Some(&b))
            );
        }
    }
}
