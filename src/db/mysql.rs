//! MySQL-backed usage record store (production)

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use crate::config::{DatabaseEndpoint, DatabaseSettings};

/// Store over a MySQL read replica and write primary
pub struct MySqlUsageStore {
    read: MySqlPool,
    write: MySqlPool,
    statement_timeout: Duration,
}

impl MySqlUsageStore {
    pub fn new(read: MySqlPool, write: MySqlPool, statement_timeout: Duration) -> Self {
        Self {
            read,
            write,
            statement_timeout,
        }
    }

    /// Build lazily-connecting pools for both endpoints.
    ///
    /// No connection is opened here; an unreachable endpoint surfaces on the
    /// first statement (and on `/ready`).
    pub fn connect_lazy(settings: &DatabaseSettings) -> Self {
        let pool = |endpoint: &DatabaseEndpoint| {
            MySqlPoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(settings.acquire_timeout())
                .connect_lazy_with(connect_options(endpoint))
        };

        tracing::debug!(
            read_host = %settings.read.host,
            write_host = %settings.write.host,
            database = %settings.write.database,
            "Creating MySQL pools"
        );

        Self::new(
            pool(&settings.read),
            pool(&settings.write),
            settings.statement_timeout(),
        )
    }
}

fn connect_options(endpoint: &DatabaseEndpoint) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&endpoint.host)
        .port(endpoint.port)
        .database(&endpoint.database)
        .username(&endpoint.user)
        .password(&endpoint.password)
}

crate::db::sql::usage_record_store!(MySqlUsageStore);
