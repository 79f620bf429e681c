//! Resilience patterns for calls to external systems.

mod retry;

pub use retry::{ExponentialBackoff, RetryExhausted, RetryPolicy, retry_async};
