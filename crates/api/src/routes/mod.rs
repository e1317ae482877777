pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/{job_id}", get(handlers::jobs::get_job))
        .route("/anomalies", get(handlers::anomalies::list_anomalies))
        .route("/ledger/status", get(handlers::status::ledger_status))
}
