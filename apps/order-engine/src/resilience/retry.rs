//! Bounded retry with exponential backoff and jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use order_engine::resilience::{RetryPolicy, retry_async};
//!
//! let policy = RetryPolicy::default();
//! let outcome = retry_async(&policy, || queue.publish(&order), QueueError::is_retryable).await;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How often and how patiently to retry a failing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (default: 3).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 50ms).
    pub initial_backoff: Duration,
    /// Upper bound on any single delay (default: 2s).
    pub max_backoff: Duration,
    /// Growth factor between delays (default: 2.0).
    pub backoff_multiplier: f64,
    /// Relative randomization of each delay (default: 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retries without delay; for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Produces the delay before each retry.
#[derive(Debug)]
pub struct ExponentialBackoff {
    retries_taken: u32,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoff {
    /// Backoff for a policy; allows `max_attempts - 1` retries.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            retries_taken: 0,
            max_retries: policy.max_attempts.saturating_sub(1),
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Delay before the next retry, or `None` once retries are used up.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries_taken >= self.max_retries {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);
        self.retries_taken += 1;

        Some(Duration::from_millis(capped_ms))
    }

    /// Retries handed out so far.
    #[must_use]
    pub const fn retries_taken(&self) -> u32 {
        self.retries_taken
    }

    fn base_backoff_ms(&self) -> u64 {
        let factor = self.backoff_multiplier.powi(self.retries_taken as i32);
        let backoff = (self.initial_backoff_ms as f64 * factor) as u64;
        backoff.min(self.max_backoff_ms)
    }

    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let spread = backoff_ms as f64 * self.jitter_factor;
        let low = (backoff_ms as f64 - spread).max(0.0);
        let high = backoff_ms as f64 + spread;
        rand::rng().random_range(low..=high) as u64
    }
}

/// Failure after retries were exhausted or a non-retryable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Last error observed.
    pub error: E,
    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Run `op` until it succeeds, `is_retryable` rejects its error, or the
/// policy's attempts are spent. Returns the value and the attempt count.
///
/// # Errors
///
/// Returns [`RetryExhausted`] carrying the last error.
pub async fn retry_async<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: R,
) -> Result<(T, u32), RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = ExponentialBackoff::new(policy);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok((value, attempts)),
            Err(error) => {
                let delay = if is_retryable(&error) {
                    backoff.next_backoff()
                } else {
                    None
                };
                let Some(delay) = delay else {
                    return Err(RetryExhausted { error, attempts });
                };
                tracing::debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(50));
        assert_eq!(policy.max_backoff, Duration::from_secs(2));
    }

    #[test]
    fn backoff_sequence_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            jitter_factor: 0.0,
            ..RetryPolicy::default()
        };
        let mut backoff = ExponentialBackoff::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(800)));
        assert!(backoff.next_backoff().is_none());
        assert_eq!(backoff.retries_taken(), 4);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(3),
            backoff_multiplier: 10.0,
            jitter_factor: 0.0,
        };
        let mut backoff = ExponentialBackoff::new(&policy);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn jitter_stays_in_range() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        for _ in 0..100 {
            let mut backoff = ExponentialBackoff::new(&policy);
            let delay = backoff.next_backoff().unwrap();
            assert!(
                delay >= Duration::from_millis(80) && delay <= Duration::from_millis(120),
                "delay {delay:?} outside 80-120ms"
            );
        }
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let mut backoff = ExponentialBackoff::new(&RetryPolicy::once());
        assert!(backoff.next_backoff().is_none());
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_async(
            &RetryPolicy::immediate(3),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("flaky") } else { Ok(n) } }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok((2, 3)));
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), _> = retry_async(
            &RetryPolicy::immediate(4),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            },
            |_| true,
        )
        .await;
        assert_eq!(
            result,
            Err(RetryExhausted {
                error: "down",
                attempts: 4
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), _> = retry_async(
            &RetryPolicy::immediate(5),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal") }
            },
            |_| false,
        )
        .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
