//! Monitor process endpoints
//!
//! `/api/monitor/processes[/{user_id}]` operate on a user's records,
//! `/api/monitor/process[/{computation_id}]` on single records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

use crate::db::{NewUsageRecord, UsageRecord};
use crate::error::ApiError;
use crate::middleware::Caller;
use crate::server::state::AppState;
use crate::services::DeleteOutcome;

/// Body returned when a delete removed rows
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

impl IntoResponse for DeleteOutcome {
    fn into_response(self) -> Response {
        match self {
            DeleteOutcome::Deleted(deleted) => {
                (StatusCode::OK, Json(DeleteResponse { deleted })).into_response()
            }
            DeleteOutcome::NothingToDelete => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// GET /api/monitor/processes
pub async fn list_processes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<UsageRecord>>, ApiError> {
    let records = state.records.list_all(&caller).await?;
    Ok(Json(records))
}

/// GET /api/monitor/processes/{user_id}
pub async fn list_user_processes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UsageRecord>>, ApiError> {
    let records = state.records.list_for_user(&caller, &user_id).await?;
    Ok(Json(records))
}

/// DELETE /api/monitor/processes/{user_id}
pub async fn delete_user_processes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<DeleteOutcome, ApiError> {
    state.records.delete_for_user(&caller, &user_id).await
}

/// POST /api/monitor/process
pub async fn create_process(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(record): Json<NewUsageRecord>,
) -> Result<Json<UsageRecord>, ApiError> {
    let created = state.records.create(&caller, record).await?;
    Ok(Json(created))
}

/// GET /api/monitor/process/{computation_id}
pub async fn get_process(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(computation_id): Path<String>,
) -> Result<Json<UsageRecord>, ApiError> {
    let record = state.records.get(&caller, &computation_id).await?;
    Ok(Json(record))
}

/// DELETE /api/monitor/process/{computation_id}
pub async fn delete_process(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(computation_id): Path<String>,
) -> Result<DeleteOutcome, ApiError> {
    state.records.delete(&caller, &computation_id).await
}
