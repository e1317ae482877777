//! Repository for the `projection_anomalies` table.

use gridmart_core::types::DbId;
use sqlx::PgPool;

use crate::models::anomaly::AnomalyRow;

/// Maximum page size for anomaly listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for anomaly listing.
const DEFAULT_LIMIT: i64 = 50;

/// Append and list projection anomalies.
pub struct AnomalyRepo;

impl AnomalyRepo {
    /// Record one detected anomaly.
    pub async fn record(
        pool: &PgPool,
        job_id: &str,
        event_kind: &str,
        anomaly_kind: &str,
        detail: &str,
    ) -> Result<DbId, sqlx::Error> {
        let row: (DbId,) = sqlx::query_as(
            "INSERT INTO projection_anomalies (job_id, event_kind, anomaly_kind, detail) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(job_id)
        .bind(event_kind)
        .bind(anomaly_kind)
        .bind(detail)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// List the most recent anomalies.
    pub async fn list_recent(
        pool: &PgPool,
        limit: Option<i64>,
    ) -> Result<Vec<AnomalyRow>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        sqlx::query_as::<_, AnomalyRow>(
            "SELECT id, job_id, event_kind, anomaly_kind, detail, created_at \
             FROM projection_anomalies ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
