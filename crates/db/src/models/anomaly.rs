//! Projection anomaly rows.

use gridmart_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `projection_anomalies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnomalyRow {
    pub id: DbId,
    pub job_id: String,
    pub event_kind: String,
    pub anomaly_kind: String,
    pub detail: String,
    pub created_at: Timestamp,
}
