//! Job submission and polling handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use validator::Validate;

use genhub_core::error::AppError;
use genhub_entity::job::JobView;
use genhub_worker::Submission;

use crate::dto::request::SubmitJobRequest;
use crate::dto::response::{ApiResponse, SubmissionResponse};
use crate::error::ApiResult;
use crate::extractors::{Caller, parse_job_id};
use crate::state::AppState;

/// POST /api/jobs
///
/// 200 with the result in sync mode, 202 with a job id in async mode.
pub async fn submit_job(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SubmissionResponse>>)> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let submission = state
        .dispatcher
        .submit(&req.job_type, req.payload, caller.0)
        .await?;

    let status = match submission {
        Submission::Sync { .. } => StatusCode::OK,
        Submission::Async { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(ApiResponse::ok(submission.into()))))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<JobView>>> {
    let id = parse_job_id(&id)?;
    let view = state.dispatcher.poll(id, caller.owner()).await?;
    Ok(Json(ApiResponse::ok(view)))
}
