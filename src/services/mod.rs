//! Service layer
//!
//! Business logic between the HTTP handlers and the store.

pub mod usage_records;

pub use usage_records::{DeleteOutcome, UsageRecordService};
