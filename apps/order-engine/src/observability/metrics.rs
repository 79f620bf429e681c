//! Prometheus metrics for the order engine.
//!
//! Recording functions are safe to call before (or without) installing the
//! exporter; the `metrics` facade drops samples when no recorder is set.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for placement latency (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Exporter on `addr` with the default latency buckets.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            // 500us to 5s
            latency_buckets: vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Start the Prometheus exporter serving `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Record the end of one placement.
///
/// # Arguments
///
/// * `side` - `BUY` or `SELL`
/// * `outcome` - error code, or `"placed"`
/// * `latency_seconds` - time from request to result
pub fn record_order_placement(side: &str, outcome: &str, latency_seconds: f64) {
    counter!(
        "orders_placed_total",
        "side" => side.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!("order_placement_seconds", "outcome" => outcome.to_string())
        .record(latency_seconds);
}

/// Record the result of handing one order to the queue.
///
/// `outcome` is `"delivered"` or `"failed"`.
pub fn record_dispatch(outcome: &'static str) {
    counter!("order_dispatch_total", "outcome" => outcome).increment(1);
}

/// Record orders delivered by one relay sweep.
pub fn record_relay_delivered(count: u64) {
    counter!("outbox_relay_delivered_total").increment(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_a_no_op() {
        record_order_placement("BUY", "placed", 0.01);
        record_dispatch("failed");
        record_relay_delivered(3);
    }

    #[test]
    fn config_keeps_address() {
        let addr: SocketAddr = "127.0.0.1:9464".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr, addr);
        assert!(config.latency_buckets.windows(2).all(|w| w[0] < w[1]));
    }
}
