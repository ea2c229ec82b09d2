//! Usage record service
//!
//! Each operation runs: authorization check, then the existence or
//! uniqueness pre-check on the read endpoint, then the query or mutation.
//! The pre-check and the mutation are separate statements; the storage
//! engine's unique constraint on `computation_id` is what actually prevents
//! duplicates, the COUNT only yields a clean Conflict in the common case.

use std::sync::Arc;
use validator::Validate;

use crate::db::{EndpointHealth, NewUsageRecord, UsageRecord, UsageRecordStore};
use crate::error::ApiError;
use crate::middleware::Caller;

/// Result of a delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Matching rows existed and were removed
    Deleted(u64),
    /// Nothing matched; no statement was issued against the write endpoint
    NothingToDelete,
}

#[derive(Clone)]
pub struct UsageRecordService {
    store: Arc<dyn UsageRecordStore>,
}

impl UsageRecordService {
    pub fn new(store: Arc<dyn UsageRecordStore>) -> Self {
        Self { store }
    }

    /// List every record. Admin only.
    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<UsageRecord>, ApiError> {
        caller.require_admin()?;
        Ok(self.store.list_all().await?)
    }

    /// List one user's records; empty when the user has none.
    pub async fn list_for_user(
        &self,
        caller: &Caller,
        user_id: &str,
    ) -> Result<Vec<UsageRecord>, ApiError> {
        caller.require_subject_or_admin(user_id)?;
        Ok(self.store.list_by_user(user_id).await?)
    }

    pub async fn get(&self, caller: &Caller, computation_id: &str) -> Result<UsageRecord, ApiError> {
        caller.require_admin()?;
        self.store
            .find_by_computation(computation_id)
            .await?
            .ok_or_else(|| not_found(computation_id))
    }

    /// Insert a record and return it with its generated id
    pub async fn create(
        &self,
        caller: &Caller,
        record: NewUsageRecord,
    ) -> Result<UsageRecord, ApiError> {
        caller.require_admin()?;
        record.validate()?;

        if self.store.count_by_computation(&record.computation_id).await? > 0 {
            tracing::info!(computation_id = %record.computation_id, "Rejecting duplicate computation id");
            return Err(conflict(&record.computation_id));
        }

        self.store.insert(&record).await.map_err(|e| match ApiError::from(e) {
            // lost the race against a concurrent create
            ApiError::Conflict(_) => conflict(&record.computation_id),
            other => other,
        })?;

        let created = self
            .store
            .find_by_computation_primary(&record.computation_id)
            .await?
            .ok_or_else(|| {
                ApiError::DatabaseError(format!(
                    "Record for computation '{}' missing after insert",
                    record.computation_id
                ))
            })?;

        tracing::info!(
            id = created.id,
            user_id = %created.user_id,
            computation_id = %created.computation_id,
            "Created usage record"
        );

        Ok(created)
    }

    /// Delete all of a user's records; absent user is a no-op
    pub async fn delete_for_user(
        &self,
        caller: &Caller,
        user_id: &str,
    ) -> Result<DeleteOutcome, ApiError> {
        caller.require_subject_or_admin(user_id)?;

        if self.store.count_by_user(user_id).await? == 0 {
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let deleted = self.store.delete_by_user(user_id).await?;
        tracing::info!(user_id = %user_id, deleted, "Deleted usage records for user");

        Ok(DeleteOutcome::Deleted(deleted))
    }

    /// Delete one record; absent record is a no-op
    pub async fn delete(
        &self,
        caller: &Caller,
        computation_id: &str,
    ) -> Result<DeleteOutcome, ApiError> {
        caller.require_computation_or_admin(computation_id)?;

        if self.store.count_by_computation(computation_id).await? == 0 {
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let deleted = self.store.delete_by_computation(computation_id).await?;
        tracing::info!(computation_id = %computation_id, deleted, "Deleted usage record");

        Ok(DeleteOutcome::Deleted(deleted))
    }

    pub async fn health(&self) -> EndpointHealth {
        self.store.ping().await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn not_found(computation_id: &str) -> ApiError {
    ApiError::NotFound(format!("No record for computation '{}'", computation_id))
}

fn conflict(computation_id: &str) -> ApiError {
    ApiError::Conflict(format!(
        "A record for computation '{}' already exists",
        computation_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSettings;
    use crate::db::SqliteUsageStore;

    async fn service() -> (UsageRecordService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.db").display().to_string();
        let mut settings = DatabaseSettings::default();
        settings.read.database = path.clone();
        settings.write.database = path;

        let store = SqliteUsageStore::connect(&settings).await.unwrap();
        (UsageRecordService::new(Arc::new(store)), dir)
    }

    fn payload(user_id: &str, computation_id: &str) -> NewUsageRecord {
        NewUsageRecord {
            user_id: user_id.to_string(),
            computation_id: computation_id.to_string(),
            vcpu_usage: 2,
            memory_usage: 512,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (service, _dir) = service().await;
        let admin = Caller::admin();

        let created = service.create(&admin, payload("u1", "c1")).await.unwrap();
        assert_eq!(
            created,
            UsageRecord {
                id: 1,
                user_id: "u1".to_string(),
                computation_id: "c1".to_string(),
                vcpu_usage: 2,
                memory_usage: 512,
            }
        );

        let fetched = service.get(&admin, "c1").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_keeps_original() {
        let (service, _dir) = service().await;
        let admin = Caller::admin();

        let first = service.create(&admin, payload("u1", "c1")).await.unwrap();

        let mut second = payload("u2", "c1");
        second.vcpu_usage = 8;
        let err = service.create(&admin, second).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        assert_eq!(service.get(&admin, "c1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let (service, _dir) = service().await;

        let err = service
            .create(&Caller::user("u1"), payload("u1", "c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(service.list_all(&Caller::admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_payload() {
        let (service, _dir) = service().await;

        let err = service
            .create(&Caller::admin(), payload("u1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (service, _dir) = service().await;

        let err = service.get(&Caller::admin(), "nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_for_user_authorization() {
        let (service, _dir) = service().await;
        service.create(&Caller::admin(), payload("u1", "c1")).await.unwrap();
        service.create(&Caller::admin(), payload("u2", "c2")).await.unwrap();

        let own = service.list_for_user(&Caller::user("u1"), "u1").await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].computation_id, "c1");

        let err = service
            .list_for_user(&Caller::user("u1"), "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let none = service.list_for_user(&Caller::user("u3"), "u3").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let (service, _dir) = service().await;
        let admin = Caller::admin();
        service.create(&admin, payload("u1", "c1")).await.unwrap();
        service.create(&admin, payload("u1", "c2")).await.unwrap();
        service.create(&admin, payload("u2", "c3")).await.unwrap();

        let outcome = service.delete_for_user(&Caller::user("u1"), "u1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted(2));

        let outcome = service.delete_for_user(&admin, "u1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NothingToDelete);

        assert_eq!(service.list_all(&admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_single_record() {
        let (service, _dir) = service().await;
        let admin = Caller::admin();
        service.create(&admin, payload("u1", "c1")).await.unwrap();
        service.create(&admin, payload("u1", "c2")).await.unwrap();

        assert_eq!(service.delete(&admin, "c1").await.unwrap(), DeleteOutcome::Deleted(1));
        assert!(matches!(
            service.get(&admin, "c1").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert_eq!(service.get(&admin, "c2").await.unwrap().computation_id, "c2");

        assert_eq!(
            service.delete(&admin, "c1").await.unwrap(),
            DeleteOutcome::NothingToDelete
        );
    }

    #[tokio::test]
    async fn test_delete_single_record_by_computation_claim() {
        let (service, _dir) = service().await;
        service.create(&Caller::admin(), payload("u1", "c1")).await.unwrap();

        let err = service.delete(&Caller::user("u1"), "c1").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let holder = Caller {
            computation_id: Some("c1".to_string()),
            ..Caller::default()
        };
        assert_eq!(service.delete(&holder, "c1").await.unwrap(), DeleteOutcome::Deleted(1));
    }
}
