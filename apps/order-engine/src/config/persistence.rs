//! Order storage configuration.

use serde::{Deserialize, Serialize};

/// Where orders and reference data live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    /// Embedded Turso database file.
    #[default]
    Turso,
    /// Process memory; lost on exit.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: PersistenceBackend,
    /// Database path for the Turso backend.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./data/orders.db".to_string()
}
