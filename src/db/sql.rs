//! SQL shared by the MySQL and SQLite stores
//!
//! Both engines accept `?` placeholders, so one set of statements serves
//! both. `usage_record_store!` expands to the `UsageRecordStore` impl for a
//! store struct holding `read`/`write` pools and a `statement_timeout`.

pub(crate) const SELECT_ALL: &str =
    "SELECT id, user_id, computation_id, vcpu_usage, memory_usage FROM monitor";

pub(crate) const SELECT_BY_USER: &str =
    "SELECT id, user_id, computation_id, vcpu_usage, memory_usage FROM monitor WHERE user_id = ?";

pub(crate) const SELECT_BY_COMPUTATION: &str =
    "SELECT id, user_id, computation_id, vcpu_usage, memory_usage FROM monitor WHERE computation_id = ?";

pub(crate) const COUNT_BY_USER: &str = "SELECT COUNT(*) FROM monitor WHERE user_id = ?";

pub(crate) const COUNT_BY_COMPUTATION: &str =
    "SELECT COUNT(*) FROM monitor WHERE computation_id = ?";

pub(crate) const INSERT: &str =
    "INSERT INTO monitor (user_id, computation_id, vcpu_usage, memory_usage) VALUES (?, ?, ?, ?)";

pub(crate) const DELETE_BY_USER: &str = "DELETE FROM monitor WHERE user_id = ?";

pub(crate) const DELETE_BY_COMPUTATION: &str = "DELETE FROM monitor WHERE computation_id = ?";

pub(crate) const PING: &str = "SELECT 1";

macro_rules! usage_record_store {
    ($store:ty) => {
        #[async_trait::async_trait]
        impl $crate::db::store::UsageRecordStore for $store {
            async fn list_all(&self) -> $crate::db::store::StoreResult<Vec<$crate::db::UsageRecord>> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_as::<_, $crate::db::UsageRecord>($crate::db::sql::SELECT_ALL)
                        .fetch_all(&self.read),
                )
                .await
            }

            async fn list_by_user(
                &self,
                user_id: &str,
            ) -> $crate::db::store::StoreResult<Vec<$crate::db::UsageRecord>> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_as::<_, $crate::db::UsageRecord>($crate::db::sql::SELECT_BY_USER)
                        .bind(user_id)
                        .fetch_all(&self.read),
                )
                .await
            }

            async fn find_by_computation(
                &self,
                computation_id: &str,
            ) -> $crate::db::store::StoreResult<Option<$crate::db::UsageRecord>> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_as::<_, $crate::db::UsageRecord>(
                        $crate::db::sql::SELECT_BY_COMPUTATION,
                    )
                    .bind(computation_id)
                    .fetch_optional(&self.read),
                )
                .await
            }

            async fn find_by_computation_primary(
                &self,
                computation_id: &str,
            ) -> $crate::db::store::StoreResult<Option<$crate::db::UsageRecord>> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_as::<_, $crate::db::UsageRecord>(
                        $crate::db::sql::SELECT_BY_COMPUTATION,
                    )
                    .bind(computation_id)
                    .fetch_optional(&self.write),
                )
                .await
            }

            async fn count_by_user(&self, user_id: &str) -> $crate::db::store::StoreResult<i64> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_scalar::<_, i64>($crate::db::sql::COUNT_BY_USER)
                        .bind(user_id)
                        .fetch_one(&self.read),
                )
                .await
            }

            async fn count_by_computation(
                &self,
                computation_id: &str,
            ) -> $crate::db::store::StoreResult<i64> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query_scalar::<_, i64>($crate::db::sql::COUNT_BY_COMPUTATION)
                        .bind(computation_id)
                        .fetch_one(&self.read),
                )
                .await
            }

            async fn insert(
                &self,
                record: &$crate::db::NewUsageRecord,
            ) -> $crate::db::store::StoreResult<()> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query($crate::db::sql::INSERT)
                        .bind(record.user_id.as_str())
                        .bind(record.computation_id.as_str())
                        .bind(record.vcpu_usage)
                        .bind(record.memory_usage)
                        .execute(&self.write),
                )
                .await
                .map(|_| ())
            }

            async fn delete_by_user(&self, user_id: &str) -> $crate::db::store::StoreResult<u64> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query($crate::db::sql::DELETE_BY_USER)
                        .bind(user_id)
                        .execute(&self.write),
                )
                .await
                .map(|result| result.rows_affected())
            }

            async fn delete_by_computation(
                &self,
                computation_id: &str,
            ) -> $crate::db::store::StoreResult<u64> {
                $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query($crate::db::sql::DELETE_BY_COMPUTATION)
                        .bind(computation_id)
                        .execute(&self.write),
                )
                .await
                .map(|result| result.rows_affected())
            }

            async fn ping(&self) -> $crate::db::store::EndpointHealth {
                let read = $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query($crate::db::sql::PING).execute(&self.read),
                )
                .await;
                let write = $crate::db::store::timed(
                    self.statement_timeout,
                    sqlx::query($crate::db::sql::PING).execute(&self.write),
                )
                .await;

                if let Err(e) = &read {
                    tracing::warn!(error = %e, "Read endpoint ping failed");
                }
                if let Err(e) = &write {
                    tracing::warn!(error = %e, "Write endpoint ping failed");
                }

                $crate::db::store::EndpointHealth {
                    read: read.is_ok(),
                    write: write.is_ok(),
                }
            }

            async fn close(&self) {
                self.read.close().await;
                self.write.close().await;
            }
        }
    };
}

pub(crate) use usage_record_store;
