//! Job store diagnostics.

use axum::Json;
use axum::extract::{Path, State};

use genhub_core::error::AppError;
use genhub_worker::JobStats;

use crate::dto::response::{ApiResponse, JobListingResponse, MessageResponse};
use crate::error::ApiResult;
use crate::extractors::parse_job_id;
use crate::state::AppState;

/// GET /api/admin/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<ApiResponse<JobListingResponse>> {
    let jobs = state.store.list().await;
    let owners = state.store.owners().await;
    let stats = state.store.stats().await;
    Json(ApiResponse::ok(JobListingResponse {
        jobs,
        owners,
        stats,
    }))
}

/// GET /api/admin/jobs/stats
pub async fn job_stats(State(state): State<AppState>) -> Json<ApiResponse<JobStats>> {
    Json(ApiResponse::ok(state.store.stats().await))
}

/// DELETE /api/admin/jobs/{id}
///
/// Does not stop a processor that is already running the job.
pub async fn remove_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let id = parse_job_id(&id)?;
    if !state.store.remove(id).await {
        return Err(AppError::not_found(format!("Job {id} not found")).into());
    }
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: format!("Job {id} removed"),
    })))
}
