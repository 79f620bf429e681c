//! Order management errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors raised by the order aggregate and its domain services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The status change is not an edge of the lifecycle graph.
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// A filled order cannot be withdrawn.
    CannotCancel {
        /// Current status.
        status: OrderStatus,
    },

    /// Remaining quantity would be inconsistent with the status.
    InvariantViolation {
        /// Invariant description.
        invariant: String,
        /// Values that broke it.
        state: String,
    },

    /// A constructor argument is out of range.
    InvalidParameters {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to } => {
                write!(f, "order cannot move from {from} to {to}")
            }
            Self::CannotCancel { status } => {
                write!(f, "order in status {status} cannot be cancelled")
            }
            Self::InvariantViolation { invariant, state } => {
                write!(f, "order invariant violated: {invariant} ({state})")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "invalid order field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

/// Errors surfaced by an [`OrderRepository`](super::repository::OrderRepository).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// No order exists with the given id.
    #[error("no order found with id {order_id}")]
    NotFound {
        /// The missing id.
        order_id: String,
    },

    /// The stored order changed since it was read; the write was skipped.
    #[error("order {order_id} was modified concurrently")]
    Conflict {
        /// Row id.
        order_id: String,
    },

    /// The backing store failed.
    #[error("order storage failure: {0}")]
    Storage(String),

    /// A stored row could not be turned back into an order.
    #[error("corrupt order row {order_id}: {reason}")]
    Corrupt {
        /// Row id.
        order_id: String,
        /// Decoding failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_both_states() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Filled,
            to: OrderStatus::Open,
        };
        let msg = err.to_string();
        assert!(msg.contains("FILLED"));
        assert!(msg.contains("OPEN"));
    }

    #[test]
    fn cannot_cancel_mentions_status() {
        let err = OrderError::CannotCancel {
            status: OrderStatus::Filled,
        };
        assert!(err.to_string().contains("FILLED"));
    }

    #[test]
    fn conflict_names_the_order() {
        let err = RepositoryError::Conflict {
            order_id: "o-1".to_string(),
        };
        assert_eq!(err.to_string(), "order o-1 was modified concurrently");
    }

    #[test]
    fn repository_not_found_matches_storage_wording() {
        let err = RepositoryError::NotFound {
            order_id: "o-1".to_string(),
        };
        assert_eq!(err.to_string(), "no order found with id o-1");
    }
}
