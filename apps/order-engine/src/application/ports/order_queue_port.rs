//! Order Queue Port (Driven Port)
//!
//! Send-only channel to downstream processing. Delivery is at least once:
//! a message may arrive again after a relay sweep, so consumers
//! de-duplicate on the order id.

use async_trait::async_trait;

use crate::domain::order_management::Order;

/// Dispatch queue error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue could not be reached or did not acknowledge in time.
    #[error("dispatch queue unavailable: {0}")]
    Unavailable(String),

    /// The message could not be encoded.
    #[error("dispatch message encoding failed: {0}")]
    Encoding(String),

    /// The queue refused the message.
    #[error("dispatch queue rejected message: {0}")]
    Rejected(String),
}

impl QueueError {
    /// Whether publishing the same message again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Port for handing stored orders to downstream processing.
#[async_trait]
pub trait OrderQueuePort: Send + Sync {
    /// Publish one order. Returns once the queue has accepted it.
    async fn publish(&self, order: &Order) -> Result<(), QueueError>;
}
