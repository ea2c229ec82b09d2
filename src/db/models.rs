//! Usage record models
//!
//! Rows of the `monitor` table and the payload accepted on create.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One computation's resource consumption for a user.
///
/// Stored in the `monitor` table; `id` is assigned by the storage engine
/// and `computation_id` is unique across all rows. Decoded by column name,
/// so the select list order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: String,
    pub computation_id: String,
    pub vcpu_usage: i64,
    pub memory_usage: i64,
}

/// Create payload. Carries no `id`; any `id` sent by a client is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewUsageRecord {
    #[validate(length(min = 1, max = 255, message = "user_id must be 1-255 characters"))]
    pub user_id: String,

    #[validate(length(min = 1, max = 255, message = "computation_id must be 1-255 characters"))]
    pub computation_id: String,

    #[validate(range(min = 0, message = "vcpu_usage cannot be negative"))]
    pub vcpu_usage: i64,

    #[validate(range(min = 0, message = "memory_usage cannot be negative"))]
    pub memory_usage: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NewUsageRecord {
        NewUsageRecord {
            user_id: "u1".to_string(),
            computation_id: "c1".to_string(),
            vcpu_usage: 2,
            memory_usage: 512,
        }
    }

    #[test]
    fn test_valid_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_empty_ids_rejected() {
        let mut record = payload();
        record.user_id.clear();
        assert!(record.validate().is_err());

        let mut record = payload();
        record.computation_id.clear();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_negative_usage_rejected() {
        let mut record = payload();
        record.memory_usage = -1;
        let errors = record.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("memory_usage"));
    }

    #[test]
    fn test_client_supplied_id_is_ignored() {
        let record: NewUsageRecord = serde_json::from_str(
            r#"{"id": 99, "user_id": "u1", "computation_id": "c1", "vcpu_usage": 2, "memory_usage": 512}"#,
        )
        .unwrap();
        assert_eq!(record, payload());
    }

    #[test]
    fn test_record_serializes_all_fields() {
        let record = UsageRecord {
            id: 1,
            user_id: "u1".to_string(),
            computation_id: "c1".to_string(),
            vcpu_usage: 2,
            memory_usage: 512,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "user_id": "u1",
                "computation_id": "c1",
                "vcpu_usage": 2,
                "memory_usage": 512
            })
        );
    }
}
