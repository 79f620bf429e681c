//! Configuration module for the order engine.
//!
//! Loads a YAML file, interpolates environment variables and validates the
//! result before anything starts.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::load_config;
//!
//! // Load from ORDER_ENGINE_CONFIG or config.yaml
//! let config = load_config(None)?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod app;
mod engine;
mod observability;
mod persistence;
mod queue;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::{AppConfig, AppEnv};
pub use engine::{DispatchRetryConfig, EngineConfig};
pub use observability::ObservabilityConfig;
pub use persistence::{PersistenceBackend, PersistenceConfig};
pub use queue::{QueueBackend, QueueConfig};
pub use server::ServerConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ORDER_ENGINE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service identity.
    #[serde(default)]
    pub app: AppConfig,
    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
    /// Order storage.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Dispatch queue.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Placement and relay tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging, tracing and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// The path is `path`, else `$ORDER_ENGINE_CONFIG`, else `config.yaml`.
/// A missing default file yields the built-in defaults; a missing file that
/// was asked for explicitly is an error.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let explicit = path
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty()));
    let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            let config = Config::default();
            validate_config(&config)?;
            return Ok(config);
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_string(),
                source: e,
            });
        }
    };

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.app.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.server.http_port == 0 {
        return Err(ConfigError::ValidationError(
            "server.http_port must be non-zero".to_string(),
        ));
    }

    if config.server.request_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "server.request_timeout_ms must be positive".to_string(),
        ));
    }

    if config.persistence.backend == PersistenceBackend::Turso
        && config.persistence.db_path.trim().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "persistence.db_path is required for the turso backend".to_string(),
        ));
    }

    if config.queue.backend == QueueBackend::Nats {
        if config.queue.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "queue.url is required for the nats backend".to_string(),
            ));
        }
        if config.queue.subject.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "queue.subject is required for the nats backend".to_string(),
            ));
        }
    }

    if config.queue.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "queue.channel_capacity must be positive".to_string(),
        ));
    }

    let retry = &config.engine.dispatch_retry;
    if retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "engine.dispatch_retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "engine.dispatch_retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "engine.dispatch_retry.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }

    if config.engine.relay_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.relay_interval_secs must be positive".to_string(),
        ));
    }
    if config.engine.relay_batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "engine.relay_batch_size must be positive".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.app.name, "order-engine");
        assert_eq!(config.app.env, AppEnv::Development);
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.persistence.backend, PersistenceBackend::Turso);
        assert_eq!(config.queue.backend, QueueBackend::Nats);
        assert_eq!(config.engine.dispatch_retry.max_attempts, 3);
        assert!(!config.engine.reserve_open_orders);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_empty_document_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.engine.relay_batch_size, 100);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "backend: ${ORDER_ENGINE_TEST_NONEXISTENT_VAR:-memory}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "backend: memory");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "url: ${ORDER_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "url: ");
    }

    #[test]
    fn test_validation_zero_attempts() {
        let yaml = r"
engine:
  dispatch_retry:
    max_attempts: 0
";

        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero attempts");
        };
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validation_blank_subject() {
        let yaml = r#"
queue:
  backend: nats
  subject: ""
"#;

        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for blank subject");
        };
        assert!(err.to_string().contains("queue.subject"));
    }

    #[test]
    fn test_validation_unknown_backend() {
        let yaml = r"
persistence:
  backend: postgres
";

        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_config(Some("/definitely/not/here/config.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_sample_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml");
        let config = match load_config(Some(path)) {
            Ok(c) => c,
            Err(e) => panic!("sample config should load: {e}"),
        };
        assert_eq!(config.queue.subject, "orders.placed");
        assert_eq!(config.engine.relay_batch_size, 100);
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
app:
  name: "orders"
  env: production

server:
  http_port: 9000
  bind_address: "127.0.0.1"
  request_timeout_ms: 250

persistence:
  backend: memory

queue:
  backend: memory
  channel_capacity: 16

engine:
  reserve_open_orders: true
  relay_interval_secs: 10
  relay_batch_size: 50
  dispatch_retry:
    max_attempts: 5
    initial_backoff_ms: 10
    max_backoff_ms: 100
    backoff_multiplier: 3.0
    jitter_factor: 0.0

observability:
  log_level: "debug"
  metrics_addr: "0.0.0.0:9090"
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert_eq!(config.app.name, "orders");
        assert!(config.app.env.is_production());
        assert_eq!(config.server.http_addr(), "127.0.0.1:9000");
        assert_eq!(config.persistence.backend, PersistenceBackend::Memory);
        assert_eq!(config.queue.channel_capacity, 16);
        assert!(config.engine.reserve_open_orders);
        assert_eq!(config.engine.relay_interval().as_secs(), 10);

        let policy = config.engine.dispatch_retry.to_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_backoff.as_millis(), 100);

        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.metrics_addr(), Some("0.0.0.0:9090"));
        assert_eq!(config.observability.otlp_endpoint(), None);
    }
}
