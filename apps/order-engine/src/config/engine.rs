//! Placement engine tuning: dispatch retries, funds reservation and the
//! outbox relay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryPolicy;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Inline dispatch retry policy.
    #[serde(default)]
    pub dispatch_retry: DispatchRetryConfig,
    /// Count open orders against the balance and serialize placements per
    /// account and asset.
    #[serde(default)]
    pub reserve_open_orders: bool,
    /// Seconds between outbox relay sweeps.
    #[serde(default = "default_relay_interval_secs")]
    pub relay_interval_secs: u64,
    /// Orders taken per relay sweep.
    #[serde(default = "default_relay_batch_size")]
    pub relay_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_retry: DispatchRetryConfig::default(),
            reserve_open_orders: false,
            relay_interval_secs: default_relay_interval_secs(),
            relay_batch_size: default_relay_batch_size(),
        }
    }
}

impl EngineConfig {
    /// Relay interval as a duration.
    #[must_use]
    pub const fn relay_interval(&self) -> Duration {
        Duration::from_secs(self.relay_interval_secs)
    }
}

/// Retry settings in config-file units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRetryConfig {
    /// Total publish attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth factor between delays.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Relative randomization of each delay.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for DispatchRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl DispatchRetryConfig {
    /// The retry policy these settings describe.
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    50
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

const fn default_relay_interval_secs() -> u64 {
    5
}

const fn default_relay_batch_size() -> usize {
    100
}
