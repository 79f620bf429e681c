//! Order Engine Binary
//!
//! Starts the order placement engine: HTTP API plus the outbox relay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: log filter (default: `observability.log_level`)
//!
//! Any `${VAR}` in the config file is read from the environment or `.env`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use order_engine::config::{Config, load_config};
use order_engine::infrastructure::config::Container;
use order_engine::infrastructure::http::create_router;
use order_engine::observability::{MetricsConfig, init_metrics};
use order_engine::telemetry::{TelemetrySettings, init_telemetry};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Time allowed for the relay to finish its current sweep.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = load_config(None).context("loading configuration")?;
    let telemetry = TelemetrySettings::from_config(&config);
    let _guard = init_telemetry(&telemetry).context("initializing telemetry")?;

    let root = telemetry.root_span();
    run(config).instrument(root).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting order engine");
    log_config(&config);

    if let Some(addr) = config.observability.metrics_addr() {
        let addr: SocketAddr = addr.parse().context("parsing observability.metrics_addr")?;
        init_metrics(&MetricsConfig::with_addr(addr))?;
    }

    let http_addr = config.server.http_addr();
    let relay_interval = config.engine.relay_interval();

    let container = Container::from_config(config)
        .await
        .context("wiring adapters")?;

    let shutdown_token = CancellationToken::new();
    let relay_handle = start_relay(&container, relay_interval, shutdown_token.clone());

    let app = create_router(container.app_state());
    let listener = TcpListener::bind(http_addr.as_str())
        .await
        .with_context(|| format!("binding {http_addr}"))?;

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /v1/orders");
    tracing::info!("  GET  /v1/orders[/{{id}}]");
    tracing::info!("  PUT  /v1/orders/{{id}}");
    tracing::info!("  POST /v1/orders/{{id}}/cancel");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    shutdown_token.cancel();
    await_relay(relay_handle).await;

    tracing::info!("Order engine stopped");
    Ok(())
}

/// Log the loaded configuration.
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        persistence = ?config.persistence.backend,
        queue = ?config.queue.backend,
        reserve_open_orders = config.engine.reserve_open_orders,
        relay_interval_secs = config.engine.relay_interval_secs,
        "Configuration loaded"
    );
}

/// Spawn the outbox relay loop.
fn start_relay(
    container: &Container,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let relay = container.relay_outbox_use_case();
    tokio::spawn(
        async move { relay.run_until_cancelled(interval, shutdown).await }
            .in_current_span(),
    )
}

async fn await_relay(handle: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Outbox relay task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Outbox relay did not stop in time"
        ),
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// hear termination signals should not start.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
