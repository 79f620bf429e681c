//! Dispatch queue configuration.

use serde::{Deserialize, Serialize};

/// Where dispatched orders go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// NATS subject.
    #[default]
    Nats,
    /// In-process channel drained by a logging consumer.
    Memory,
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend.
    #[serde(default)]
    pub backend: QueueBackend,
    /// NATS server URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Subject orders are published to.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Per-publish timeout in milliseconds, flush included.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
    /// Capacity of the in-process channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            url: default_url(),
            subject: default_subject(),
            publish_timeout_ms: default_publish_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_subject() -> String {
    "orders.placed".to_string()
}

const fn default_publish_timeout_ms() -> u64 {
    2_000
}

const fn default_channel_capacity() -> usize {
    1024
}
