//! Embedded schema migrations.

use turso::{Connection, Value};

use super::PersistenceError;
use crate::domain::shared::Timestamp;

/// A numbered schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Monotonic version; applied in ascending order.
    pub version: i64,
    /// Short description stored alongside the version.
    pub name: &'static str,
    /// Statements run inside one transaction.
    pub statements: &'static [&'static str],
}

/// Every migration, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "reference_data",
        statements: &[
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS instruments (
                id TEXT PRIMARY KEY,
                base_asset TEXT NOT NULL,
                quote_asset TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS balances (
                account_id TEXT NOT NULL,
                asset TEXT NOT NULL,
                amount TEXT NOT NULL,
                PRIMARY KEY (account_id, asset)
            )",
        ],
    },
    Migration {
        version: 2,
        name: "orders_and_outbox",
        statements: &[
            "CREATE TABLE IF NOT EXISTS orders (
                seq INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                account_id TEXT NOT NULL,
                instrument_id TEXT NOT NULL,
                side TEXT NOT NULL,
                status TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                remaining_quantity TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS order_outbox (
                order_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                dispatched_at TEXT
            )",
        ],
    },
];

const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

pub(super) async fn apply(conn: &Connection) -> Result<usize, PersistenceError> {
    conn.execute(CREATE_MIGRATIONS_TABLE, ()).await?;
    let current = current_version(conn).await?;

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute("BEGIN", ()).await?;
        if let Err(e) = run(conn, migration).await {
            if let Err(rollback) = conn.execute("ROLLBACK", ()).await {
                tracing::error!(error = %rollback, "Migration rollback failed");
            }
            return Err(e);
        }
        conn.execute("COMMIT", ()).await?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied schema migration"
        );
        applied += 1;
    }

    Ok(applied)
}

async fn run(conn: &Connection, migration: &Migration) -> Result<(), PersistenceError> {
    for statement in migration.statements {
        conn.execute(statement, ()).await.map_err(|e| {
            PersistenceError::Query(format!("migration {}: {e}", migration.version))
        })?;
    }
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        [
            Value::Integer(migration.version),
            Value::Text(migration.name.to_string()),
            Value::Text(Timestamp::now().to_storage_string()),
        ],
    )
    .await?;
    Ok(())
}

async fn current_version(conn: &Connection) -> Result<i64, PersistenceError> {
    let mut rows = conn
        .query("SELECT MAX(version) FROM schema_migrations", ())
        .await?;
    match rows.next().await? {
        Some(row) => match row.get_value(0)? {
            Value::Integer(version) => Ok(version),
            Value::Null => Ok(0),
            other => Err(PersistenceError::Integrity(format!(
                "unexpected schema version {other:?}"
            ))),
        },
        None => Ok(0),
    }
}
