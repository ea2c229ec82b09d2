//! Database module
//!
//! Contains the usage record models, the store abstraction and its
//! MySQL/SQLite implementations over separate read and write endpoints.

pub mod models;
pub mod mysql;
pub(crate) mod sql;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseSettings};

pub use models::{NewUsageRecord, UsageRecord};
pub use mysql::MySqlUsageStore;
pub use sqlite::SqliteUsageStore;
pub use store::{EndpointHealth, StoreError, StoreResult, UsageRecordStore};

/// Build the store for the configured backend
pub async fn connect_store(settings: &DatabaseSettings) -> StoreResult<Arc<dyn UsageRecordStore>> {
    match settings.backend {
        DatabaseBackend::MySql => Ok(Arc::new(MySqlUsageStore::connect_lazy(settings))),
        DatabaseBackend::Sqlite => Ok(Arc::new(SqliteUsageStore::connect(settings).await?)),
    }
}
