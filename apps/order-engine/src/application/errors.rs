//! Engine Errors
//!
//! The error taxonomy callers of the use cases see. Every variant maps to
//! a stable [`ErrorKind`] so adapters can translate without matching on
//! messages.

use crate::domain::order_management::{OrderError, RepositoryError};
use crate::domain::reference::LookupError;
use crate::domain::shared::{Asset, Notional, OrderId};

/// Resource named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Owning account of an order request.
    Account,
    /// Instrument of an order request.
    Instrument,
    /// Balance of the settlement asset.
    Balance,
    /// A stored order.
    Order,
}

impl Resource {
    const fn not_found_message(self) -> &'static str {
        match self {
            Self::Account => "account not found",
            Self::Instrument => "instrument not found",
            Self::Balance => "balance not found for required asset",
            Self::Order => "order not found",
        }
    }
}

/// Errors returned by the order engine use cases.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request is malformed or violates a field rule.
    #[error("input validation failed: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    #[error("{}", .resource.not_found_message())]
    NotFound {
        /// Kind of record.
        resource: Resource,
        /// Identifier that was looked up.
        id: String,
    },

    /// The settlement balance is smaller than the order requires.
    #[error("insufficient funds: {asset} required {required}, available {available}")]
    InsufficientFunds {
        /// Settlement asset.
        asset: Asset,
        /// Amount the order needs.
        required: Notional,
        /// Amount the account can spend.
        available: Notional,
    },

    /// Concurrent writers kept changing the same order.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The order is stored but could not be handed to the queue. It stays
    /// pending in the outbox; the caller must not place it again.
    #[error("order {order_id} was stored but dispatch failed: {reason}")]
    DispatchFailed {
        /// Id of the stored order.
        order_id: OrderId,
        /// Last queue failure.
        reason: String,
    },

    /// The order's status does not allow the operation.
    #[error("invalid order state: {0}")]
    InvalidState(String),

    /// The caller cancelled before the order was stored.
    #[error("request cancelled")]
    Cancelled,

    /// The caller's deadline passed before the order was stored.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Order storage failed.
    #[error(transparent)]
    Repository(RepositoryError),

    /// A reference lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The background task running the write was lost.
    #[error("order task failed: {0}")]
    Task(String),
}

/// Stable classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad request data.
    InvalidInput,
    /// Missing record.
    NotFound,
    /// Balance too small.
    InsufficientFunds,
    /// Uniqueness violation.
    Conflict,
    /// Stored but not dispatched.
    DispatchFailed,
    /// Operation not allowed in the current status.
    InvalidState,
    /// Caller cancelled.
    Cancelled,
    /// Caller deadline passed.
    DeadlineExceeded,
    /// Storage, lookup or runtime failure.
    Infrastructure,
}

impl ErrorKind {
    /// Machine-readable code used in API responses and logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::Conflict => "CONFLICT",
            Self::DispatchFailed => "DISPATCH_FAILED",
            Self::InvalidState => "INVALID_STATE",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Infrastructure => "INTERNAL",
        }
    }

    /// Business-rule rejections: synchronous, nothing stored, pointless to
    /// retry unchanged.
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(
            self,
            Self::InvalidInput | Self::NotFound | Self::InsufficientFunds | Self::InvalidState
        )
    }
}

impl EngineError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::DispatchFailed { .. } => ErrorKind::DispatchFailed,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Repository(_) | Self::Lookup(_) | Self::Task(_) => ErrorKind::Infrastructure,
        }
    }

    /// Id of the stored order when the failure happened after storage.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::DispatchFailed { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    pub(crate) fn order_not_found(id: &OrderId) -> Self {
        Self::NotFound {
            resource: Resource::Order,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { order_id } => Self::NotFound {
                resource: Resource::Order,
                id: order_id,
            },
            RepositoryError::Conflict { order_id } => {
                Self::Conflict(format!("order {order_id} was modified concurrently"))
            }
            other => Self::Repository(other),
        }
    }
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStateTransition { .. } | OrderError::CannotCancel { .. } => {
                Self::InvalidState(err.to_string())
            }
            OrderError::InvariantViolation { .. } | OrderError::InvalidParameters { .. } => {
                Self::InvalidInput(err.to_string())
            }
        }
    }
}
