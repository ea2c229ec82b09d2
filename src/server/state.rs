//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::db::{connect_store, UsageRecordStore};
use crate::middleware::{AuthState, CallerResolver};
use crate::services::UsageRecordService;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Usage record operations over the read/write endpoints
    pub records: UsageRecordService,

    /// Caller resolution used by the monitor routes
    pub auth: AuthState,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state, connecting the configured store
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(
            backend = %settings.database.backend,
            read_host = %settings.database.read.host,
            write_host = %settings.database.write.host,
            "Initializing usage record store"
        );

        let store = connect_store(&settings.database).await?;

        tracing::info!("Application state initialized successfully");

        Ok(Self::with_store(settings, store))
    }

    /// Build state around an already constructed store
    pub fn with_store(settings: Settings, store: Arc<dyn UsageRecordStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            records: UsageRecordService::new(store),
            auth: AuthState::default(),
            start_time: Instant::now(),
        }
    }

    /// Replace the caller resolver (header trust by default)
    pub fn with_resolver(mut self, resolver: Arc<dyn CallerResolver>) -> Self {
        self.auth = AuthState::new(resolver);
        self
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
