//! In-process dispatch queues.
//!
//! [`ChannelOrderQueue`] hands messages to a Tokio channel for local runs
//! and tests. [`FlakyOrderQueue`] is a test double whose failures can be
//! scripted.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::application::dto::OrderDispatchMessage;
use crate::application::ports::{OrderQueuePort, QueueError};
use crate::domain::order_management::Order;
use crate::domain::shared::OrderId;

/// Dispatch queue backed by a bounded Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelOrderQueue {
    tx: mpsc::Sender<OrderDispatchMessage>,
}

impl ChannelOrderQueue {
    /// Queue holding up to `capacity` undelivered messages, plus the
    /// receiving end for the consumer.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<OrderDispatchMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OrderQueuePort for ChannelOrderQueue {
    async fn publish(&self, order: &Order) -> Result<(), QueueError> {
        // A full channel is a transient condition; let the retry policy wait.
        self.tx
            .try_send(OrderDispatchMessage::from(order))
            .map_err(|e| match e {
                TrySendError::Full(_) => QueueError::Unavailable("channel full".to_string()),
                TrySendError::Closed(_) => {
                    QueueError::Unavailable("consumer has shut down".to_string())
                }
            })
    }
}

/// Scriptable queue for failure tests.
#[derive(Debug, Default)]
pub struct FlakyOrderQueue {
    failures_left: AtomicU32,
    down: AtomicBool,
    published: Mutex<Vec<OrderId>>,
}

impl FlakyOrderQueue {
    /// Fails the next `n` publishes, then accepts.
    #[must_use]
    pub fn failing_first(n: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(n),
            ..Self::default()
        }
    }

    /// Fails every publish until [`Self::set_down`] is called with `false`.
    #[must_use]
    pub fn always_failing() -> Self {
        let queue = Self::default();
        queue.set_down(true);
        queue
    }

    /// Take the queue down or bring it back.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Ids accepted so far, in publish order.
    #[must_use]
    pub fn published(&self) -> Vec<OrderId> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl OrderQueuePort for FlakyOrderQueue {
    async fn publish(&self, order: &Order) -> Result<(), QueueError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("queue is down".to_string()));
        }
        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(QueueError::Unavailable("scripted failure".to_string()));
        }
        self.published.lock().push(order.id().clone());
        Ok(())
    }
}
