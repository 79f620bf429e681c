//! Logging and Tracing Setup
//!
//! Console logs through `tracing-subscriber` (pretty in development, JSON
//! lines in production) plus optional OpenTelemetry span export over OTLP.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::telemetry::{TelemetrySettings, init_telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetrySettings::from_config(&config))?;
//!     // ... application code
//! }
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{AppEnv, Config};

/// Failure to install the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The OTLP exporter could not be built.
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// What the subscriber needs to know.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Service name for spans and the root log span.
    pub service_name: String,
    /// Deployment environment; selects the log format.
    pub env: AppEnv,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// OTLP gRPC endpoint, if span export is wanted.
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    /// Settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_name: config.app.name.clone(),
            env: config.app.env,
            log_level: config.observability.log_level.clone(),
            otlp_endpoint: config.observability.otlp_endpoint().map(str::to_string),
        }
    }

    /// Span that every service-level event runs inside, carrying the
    /// `service` and `env` fields.
    #[must_use]
    pub fn root_span(&self) -> tracing::Span {
        tracing::info_span!(
            "order_engine",
            service = %self.service_name,
            env = self.env.as_str()
        )
    }
}

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e:?}");
            }
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Returns a guard that flushes and shuts down span export when dropped.
///
/// # Errors
///
/// Returns `TelemetryError` if the exporter cannot be built or a
/// subscriber is already installed.
pub fn init_telemetry(settings: &TelemetrySettings) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(settings.env)];

    let provider = match settings.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(
                    Resource::builder()
                        .with_service_name(settings.service_name.clone())
                        .build(),
                )
                .build();

            let tracer = provider.tracer(settings.service_name.clone());
            layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
            Some(provider)
        }
        None => None,
    };

    Registry::default().with(layers).with(env_filter).try_init()?;

    tracing::info!(
        service = %settings.service_name,
        env = settings.env.as_str(),
        otlp = provider.is_some(),
        "telemetry initialized"
    );

    Ok(TelemetryGuard { provider })
}

fn console_layer(env: AppEnv) -> BoxedLayer {
    if env.is_production() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed()
    }
}
