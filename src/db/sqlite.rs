//! SQLite-backed usage record store for local development and tests
//!
//! Both endpoints point at the same database file.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::{DatabaseEndpoint, DatabaseSettings};
use crate::db::store::{timed, StoreResult};

const CREATE_MONITOR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS monitor (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    computation_id TEXT NOT NULL UNIQUE,
    vcpu_usage INTEGER NOT NULL,
    memory_usage INTEGER NOT NULL
)
"#;

const CREATE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_monitor_user_id ON monitor (user_id)";

pub struct SqliteUsageStore {
    read: SqlitePool,
    write: SqlitePool,
    statement_timeout: Duration,
}

impl SqliteUsageStore {
    pub fn new(read: SqlitePool, write: SqlitePool, statement_timeout: Duration) -> Self {
        Self {
            read,
            write,
            statement_timeout,
        }
    }

    /// Open pools for the configured database files and create the table
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let read = open_pool(&settings.read, settings).await?;
        let write = open_pool(&settings.write, settings).await?;

        let store = Self::new(read, write, settings.statement_timeout());
        store.ensure_schema().await?;

        Ok(store)
    }

    /// Create the `monitor` table if it does not exist.
    ///
    /// `computation_id` carries a UNIQUE constraint; it is what actually
    /// rejects concurrent duplicate creates.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        timed(
            self.statement_timeout,
            sqlx::query(CREATE_MONITOR_TABLE).execute(&self.write),
        )
        .await?;
        timed(
            self.statement_timeout,
            sqlx::query(CREATE_USER_INDEX).execute(&self.write),
        )
        .await?;
        Ok(())
    }
}

async fn open_pool(endpoint: &DatabaseEndpoint, settings: &DatabaseSettings) -> StoreResult<SqlitePool> {
    tracing::debug!(path = %endpoint.database, "Opening SQLite pool");

    let options = SqliteConnectOptions::new()
        .filename(&endpoint.database)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect_with(options)
        .await?;

    Ok(pool)
}

crate::db::sql::usage_record_store!(SqliteUsageStore);
