//! Outbox state of an order: whether it has reached the dispatch queue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dispatch status of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    /// Stored, not yet acknowledged by the queue.
    Pending,
    /// Acknowledged by the queue.
    Dispatched,
}

impl DispatchStatus {
    /// Storage spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Dispatched => "DISPATCHED",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "DISPATCHED" => Ok(Self::Dispatched),
            other => Err(format!("unknown dispatch status '{other}'")),
        }
    }
}

/// Outbox bookkeeping carried alongside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchState {
    /// Current status.
    pub status: DispatchStatus,
    /// Delivery rounds attempted so far, inline and by the relay.
    pub attempts: u32,
    /// Most recent publish failure, if any.
    pub last_error: Option<String>,
}

impl DispatchState {
    /// State of a freshly persisted order.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: DispatchStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    /// True once the queue has acknowledged the order.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.status == DispatchStatus::Dispatched
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::pending()
    }
}
