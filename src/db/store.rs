//! Storage abstraction for usage records
//!
//! Reads go to the read endpoint (replica), mutations to the write
//! endpoint (primary). Each method runs exactly one statement.

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::db::models::{NewUsageRecord, UsageRecord};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reachability of the two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub read: bool,
    pub write: bool,
}

impl EndpointHealth {
    pub fn all_healthy(&self) -> bool {
        self.read && self.write
    }
}

#[async_trait]
pub trait UsageRecordStore: Send + Sync {
    /// All records, in the storage engine's natural order
    async fn list_all(&self) -> StoreResult<Vec<UsageRecord>>;

    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<UsageRecord>>;

    /// Look up a record on the read endpoint
    async fn find_by_computation(&self, computation_id: &str) -> StoreResult<Option<UsageRecord>>;

    /// Look up a record on the write endpoint, for read-your-writes after insert
    async fn find_by_computation_primary(
        &self,
        computation_id: &str,
    ) -> StoreResult<Option<UsageRecord>>;

    async fn count_by_user(&self, user_id: &str) -> StoreResult<i64>;

    async fn count_by_computation(&self, computation_id: &str) -> StoreResult<i64>;

    async fn insert(&self, record: &NewUsageRecord) -> StoreResult<()>;

    /// Returns the number of rows removed
    async fn delete_by_user(&self, user_id: &str) -> StoreResult<u64>;

    /// Returns the number of rows removed
    async fn delete_by_computation(&self, computation_id: &str) -> StoreResult<u64>;

    async fn ping(&self) -> EndpointHealth;

    /// Close both pools, waiting for checked-out connections to return
    async fn close(&self);
}

/// Run one statement under the statement timeout
pub(crate) async fn timed<T, F>(timeout: Duration, statement: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, statement).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_passes_through_result() {
        let value = timed(Duration::from_secs(1), async { Ok::<_, sqlx::Error>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_timed_reports_timeout() {
        let result = timed(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_timed_maps_database_errors() {
        let result = timed(Duration::from_secs(1), async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(matches!(result, Err(StoreError::Database(sqlx::Error::RowNotFound))));
    }

    #[test]
    fn test_endpoint_health() {
        assert!(EndpointHealth { read: true, write: true }.all_healthy());
        assert!(!EndpointHealth { read: true, write: false }.all_healthy());
    }
}
