//! Turso persistence.
//!
//! Embedded SQLite-compatible storage for orders, their outbox entries and
//! the reference data (accounts, instruments, balances) placement reads.
//! One connection is shared behind an async mutex so that multi-statement
//! transactions never interleave.

mod codec;
mod order_repository;
mod reference_repository;
mod schema;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use turso::{Builder, Connection, Database};

pub use order_repository::TursoOrderRepository;
pub use reference_repository::TursoReferenceRepository;
pub use schema::MIGRATIONS;

/// Errors from opening or migrating the database.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database could not be opened or connected.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A statement failed.
    #[error("Query error: {0}")]
    Query(String),

    /// Stored data could not be decoded.
    #[error("Data integrity error: {0}")]
    Integrity(String),
}

impl From<turso::Error> for PersistenceError {
    fn from(err: turso::Error) -> Self {
        Self::Query(err.to_string())
    }
}

/// Shared handle to one Turso database.
#[derive(Clone)]
pub struct TursoStore {
    // Keeps the database open for the connection's lifetime.
    _db: Arc<Database>,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for TursoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TursoStore").finish_non_exhaustive()
    }
}

impl TursoStore {
    /// Open (or create) the database at `path`; `":memory:"` for a
    /// throwaway database.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the file cannot be opened.
    pub async fn open(path: &str) -> Result<Self, PersistenceError> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        info!(path, "Opened Turso database");

        Ok(Self {
            _db: Arc::new(db),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// As for [`Self::open`] and [`Self::migrate`].
    pub async fn open_and_migrate(path: &str) -> Result<Self, PersistenceError> {
        let store = Self::open(path).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Returns the number of migrations applied.
    ///
    /// # Errors
    ///
    /// Returns `Query` if a migration statement fails; that migration is
    /// rolled back.
    pub async fn migrate(&self) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock().await;
        schema::apply(&conn).await
    }

    pub(crate) async fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
