//! Ledger subscription status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;

/// Current state of the ledger subscription.
#[derive(Debug, Serialize)]
pub struct LedgerStatus {
    /// Whether the subsystem was configured at startup.
    pub enabled: bool,
    /// Whether the gateway subscription is currently up. A `false`
    /// here with `enabled: true` means the supervisor is reconnecting
    /// and the projection may be stale.
    pub connected: bool,
}

/// GET /api/v1/ledger/status
pub async fn ledger_status(State(state): State<AppState>) -> Json<DataResponse<LedgerStatus>> {
    let status = match &state.ledger {
        Some(manager) => LedgerStatus {
            enabled: true,
            connected: manager.is_connected(),
        },
        None => LedgerStatus {
            enabled: false,
            connected: false,
        },
    };
    Json(DataResponse { data: status })
}
