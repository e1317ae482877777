//! Durable anomaly persistence.
//!
//! [`AnomalyPersistence`] subscribes to the manager's projection event
//! bus and mirrors every [`ProjectionEvent::Anomaly`] into the
//! `projection_anomalies` table. It runs as a long-lived background
//! task off the ingestion hot path and shuts down when the bus sender
//! is dropped.

use tokio::sync::broadcast;

use gridmart_db::repositories::AnomalyRepo;
use gridmart_db::DbPool;

use crate::events::ProjectionEvent;

/// Background service that persists projection anomalies.
pub struct AnomalyPersistence;

impl AnomalyPersistence {
    /// Run the persistence loop.
    ///
    /// Lagging behind the bus or a failed insert degrades to a log
    /// line; it never applies backpressure to ingestion.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<ProjectionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(ProjectionEvent::Anomaly(anomaly)) => {
                    if let Err(e) = AnomalyRepo::record(
                        &pool,
                        &anomaly.job_id,
                        anomaly.event_kind,
                        anomaly.kind.as_str(),
                        &anomaly.detail,
                    )
                    .await
                    {
                        tracing::error!(
                            error = %e,
                            job_id = %anomaly.job_id,
                            "Failed to persist projection anomaly",
                        );
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Anomaly persistence lagged, some events were not inspected",
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Projection event bus closed, anomaly persistence shutting down");
                    break;
                }
            }
        }
    }
}
