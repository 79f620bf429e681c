//! Service identity and deployment environment.

use serde::{Deserialize, Serialize};

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    /// Local development: pretty logs.
    #[default]
    Development,
    /// Deployed: JSON logs.
    Production,
}

impl AppEnv {
    /// Lowercase name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether this is a production deployment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service name attached to every log event.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Deployment environment.
    #[serde(default)]
    pub env: AppEnv,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: AppEnv::default(),
        }
    }
}

fn default_app_name() -> String {
    "order-engine".to_string()
}
