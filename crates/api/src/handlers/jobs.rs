//! Handlers for the `/jobs` resource.
//!
//! Read-only: the projection is written exclusively by the ledger
//! pipeline. Responses may trail the ledger by at most the ingestion
//! latency.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use gridmart_core::error::CoreError;
use gridmart_db::models::job::JobListQuery;
use gridmart_db::repositories::JobRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/jobs
///
/// List jobs, newest-created first. Supports optional `status`,
/// `limit`, and `offset` query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{job_id}
///
/// Fetch a single job by its ledger-assigned id. An unknown id is a
/// normal 404, not an internal error.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_job_id(&state.pool, &job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    Ok(Json(DataResponse { data: job }))
}
