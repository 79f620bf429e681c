//! Logging, tracing export and metrics configuration.

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default level filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; span export is off when empty.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    /// Prometheus listen address; metrics are off when empty.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
            metrics_addr: None,
        }
    }
}

impl ObservabilityConfig {
    /// The OTLP endpoint, treating a blank value as unset.
    #[must_use]
    pub fn otlp_endpoint(&self) -> Option<&str> {
        non_blank(self.otlp_endpoint.as_deref())
    }

    /// The metrics address, treating a blank value as unset.
    #[must_use]
    pub fn metrics_addr(&self) -> Option<&str> {
        non_blank(self.metrics_addr.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_log_level() -> String {
    "info".to_string()
}
