//! Handlers for the `/anomalies` resource.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use gridmart_db::repositories::AnomalyRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /api/v1/anomalies`.
#[derive(Debug, Deserialize)]
pub struct AnomalyListQuery {
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
}

/// GET /api/v1/anomalies
///
/// Most recent projection anomalies, newest first. This is the
/// operator's window into write-once conflicts and sequencing issues
/// the projector has flagged.
pub async fn list_anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomalyListQuery>,
) -> AppResult<impl IntoResponse> {
    let anomalies = AnomalyRepo::list_recent(&state.pool, params.limit).await?;
    Ok(Json(DataResponse { data: anomalies }))
}
