//! Observability module for metrics.
//!
//! Prometheus export plus the recording helpers the use cases call.
//! Logging and span export live in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_dispatch, record_order_placement,
    record_relay_delivered,
};
