//! Order State Machine
//!
//! Lifecycle edges an order may take once stored.

use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::value_objects::OrderStatus;

/// Validates order status transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// True when `from -> to` is an edge of the lifecycle graph.
    ///
    /// PARTIALLY_FILLED may repeat as further quantity executes.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            (
                OrderStatus::Open,
                OrderStatus::PartiallyFilled | OrderStatus::Filled | OrderStatus::Cancelled
            ) | (
                OrderStatus::PartiallyFilled,
                OrderStatus::PartiallyFilled | OrderStatus::Filled | OrderStatus::Cancelled
            )
        )
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the edge does not exist.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition { from, to })
        }
    }

    /// Statuses reachable in one step.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Open | OrderStatus::PartiallyFilled => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Filled | OrderStatus::Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderStatus::Open, OrderStatus::PartiallyFilled, true)]
    #[test_case(OrderStatus::Open, OrderStatus::Filled, true)]
    #[test_case(OrderStatus::Open, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Open, OrderStatus::Open, false)]
    #[test_case(OrderStatus::PartiallyFilled, OrderStatus::PartiallyFilled, true)]
    #[test_case(OrderStatus::PartiallyFilled, OrderStatus::Filled, true)]
    #[test_case(OrderStatus::PartiallyFilled, OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::PartiallyFilled, OrderStatus::Open, false)]
    #[test_case(OrderStatus::Filled, OrderStatus::Cancelled, false)]
    #[test_case(OrderStatus::Filled, OrderStatus::Open, false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Open, false)]
    #[test_case(OrderStatus::Cancelled, OrderStatus::Filled, false)]
    fn transition_table(from: OrderStatus, to: OrderStatus, allowed: bool) {
        assert_eq!(OrderStateMachine::is_valid_transition(from, to), allowed);
        assert_eq!(
            OrderStateMachine::validate_transition(from, to).is_ok(),
            allowed
        );
    }

    #[test]
    fn terminal_states_have_no_successors() {
        assert!(OrderStateMachine::valid_next_states(OrderStatus::Filled).is_empty());
        assert!(OrderStateMachine::valid_next_states(OrderStatus::Cancelled).is_empty());
        assert_eq!(OrderStateMachine::valid_next_states(OrderStatus::Open).len(), 3);
    }

    #[test]
    fn next_states_agree_with_edge_check() {
        for from in [
            OrderStatus::Open,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled,
            OrderStatus::Cancelled,
        ] {
            for to in OrderStateMachine::valid_next_states(from) {
                assert!(OrderStateMachine::is_valid_transition(from, to));
            }
        }
    }
}
