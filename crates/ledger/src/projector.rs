//! Job projector: applies canonical events to the store.
//!
//! The state machine lives in [`plan`], a pure function from the
//! current record plus one event to a [`Decision`]. The async
//! [`Projector`] wraps it with a point read, at most one store write,
//! and [`ProjectionEvent`] emission. Keeping the decision pure is what
//! makes replay, reordering, and conflict behavior exhaustively
//! testable without I/O.
//!
//! Lifecycle: `Pending → InProgress → Completed → AwaitingConfirmation
//! → Paid`. Status only ever advances; `client`, `price`, `job_hash`,
//! `accepted_by`, and `result_hash` are write-once.

use std::sync::Arc;

use tokio::sync::broadcast;

use gridmart_db::models::job::{Job, JobPatch, JobStatus};
use serde::Serialize;

use crate::events::{JobEvent, ProjectionEvent};
use crate::store::{JobStore, StoreError};

/// What kind of anomaly was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A replayed event carried a different value for a write-once
    /// field. The stored value is kept.
    WriteOnceConflict,

    /// An event arrived for a job whose creation event has not been
    /// seen. The contract guarantees ordering per job, so this points
    /// at a gateway or indexing bug.
    OutOfOrder,

    /// An event implied a backward status transition. Non-regressive
    /// fields are filled in; status stays put.
    StaleTransition,
}

impl AnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::WriteOnceConflict => "write_once_conflict",
            AnomalyKind::OutOfOrder => "out_of_order",
            AnomalyKind::StaleTransition => "stale_transition",
        }
    }
}

/// One detected anomaly, flagged for observability and persisted by
/// [`crate::persistence::AnomalyPersistence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub job_id: String,
    pub event_kind: &'static str,
    pub detail: String,
}

/// Outcome of planning one event against the current record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Write the patch.
    Apply(JobPatch),

    /// Idempotent replay; nothing to write.
    Duplicate,

    /// Write-once violation; nothing is written, the anomaly is
    /// flagged.
    Conflict(Anomaly),

    /// Event for an unseen job: write a best-effort partial record and
    /// flag the sequencing anomaly.
    OutOfOrder { patch: JobPatch, anomaly: Anomaly },

    /// Late event for an already-advanced job: fill missing fields
    /// without regressing status, and flag it.
    Stale { patch: JobPatch, anomaly: Anomaly },
}

/// Decide how one canonical event updates one job record.
pub fn plan(current: Option<&Job>, event: &JobEvent) -> Decision {
    match event {
        JobEvent::Posted {
            job_id,
            client,
            price,
            job_hash,
        } => plan_posted(current, job_id, client, price, job_hash),
        JobEvent::Accepted { job_id, provider } => plan_accepted(current, job_id, provider),
        JobEvent::Completed {
            job_id,
            result_hash,
        } => plan_completed(current, job_id, result_hash),
        JobEvent::Paid { job_id } => plan_paid(current, job_id),
    }
}

fn plan_posted(
    current: Option<&Job>,
    job_id: &str,
    client: &str,
    price: &str,
    job_hash: &str,
) -> Decision {
    let Some(job) = current else {
        return Decision::Apply(JobPatch {
            client: Some(client.to_string()),
            price: Some(price.to_string()),
            job_hash: Some(job_hash.to_string()),
            status: Some(JobStatus::Pending),
            ..Default::default()
        });
    };

    // Write-once check on the three creation fields.
    let mut conflicts = Vec::new();
    for (field, stored, incoming) in [
        ("client", job.client.as_deref(), client),
        ("price", job.price.as_deref(), price),
        ("jobHash", job.job_hash.as_deref(), job_hash),
    ] {
        if let Some(stored) = stored {
            if stored != incoming {
                conflicts.push(format!("{field}: stored `{stored}`, event `{incoming}`"));
            }
        }
    }
    if !conflicts.is_empty() {
        return Decision::Conflict(Anomaly {
            kind: AnomalyKind::WriteOnceConflict,
            job_id: job_id.to_string(),
            event_kind: "Posted",
            detail: conflicts.join("; "),
        });
    }

    // Fill whichever creation fields are still unset (the record may be
    // a partial created by an out-of-order event). Status is only set
    // on insert, never on an existing record — a replayed Posted must
    // not drag an advanced job back to Pending.
    let patch = JobPatch {
        client: job.client.is_none().then(|| client.to_string()),
        price: job.price.is_none().then(|| price.to_string()),
        job_hash: job.job_hash.is_none().then(|| job_hash.to_string()),
        ..Default::default()
    };
    if patch.is_empty() {
        Decision::Duplicate
    } else {
        Decision::Apply(patch)
    }
}

fn plan_accepted(current: Option<&Job>, job_id: &str, provider: &str) -> Decision {
    let Some(job) = current else {
        return Decision::OutOfOrder {
            patch: JobPatch {
                accepted_by: Some(provider.to_string()),
                status: Some(JobStatus::InProgress),
                ..Default::default()
            },
            anomaly: Anomaly {
                kind: AnomalyKind::OutOfOrder,
                job_id: job_id.to_string(),
                event_kind: "Accepted",
                detail: "JobAccepted before JobPosted; created partial record".to_string(),
            },
        };
    };

    match job.accepted_by.as_deref() {
        Some(stored) if stored != provider => Decision::Conflict(Anomaly {
            kind: AnomalyKind::WriteOnceConflict,
            job_id: job_id.to_string(),
            event_kind: "Accepted",
            detail: format!("acceptedBy: stored `{stored}`, event `{provider}`"),
        }),
        Some(_) => {
            // Same provider. Advance a job that somehow still reads
            // Pending; otherwise this is a replay.
            if job.status.rank() < JobStatus::InProgress.rank() {
                Decision::Apply(JobPatch {
                    status: Some(JobStatus::InProgress),
                    ..Default::default()
                })
            } else {
                Decision::Duplicate
            }
        }
        None => {
            if job.status.rank() > JobStatus::InProgress.rank() {
                // The job advanced without an acceptance on record: a
                // late Accepted fills the field but must not move
                // status backward.
                Decision::Stale {
                    patch: JobPatch {
                        accepted_by: Some(provider.to_string()),
                        ..Default::default()
                    },
                    anomaly: Anomaly {
                        kind: AnomalyKind::StaleTransition,
                        job_id: job_id.to_string(),
                        event_kind: "Accepted",
                        detail: format!(
                            "Accepted arrived with status `{}`; filled acceptedBy without regressing",
                            job.status.as_str()
                        ),
                    },
                }
            } else {
                Decision::Apply(JobPatch {
                    accepted_by: Some(provider.to_string()),
                    status: Some(JobStatus::InProgress),
                    ..Default::default()
                })
            }
        }
    }
}

fn plan_completed(current: Option<&Job>, job_id: &str, result_hash: &str) -> Decision {
    let Some(job) = current else {
        return Decision::OutOfOrder {
            patch: JobPatch {
                result_hash: Some(result_hash.to_string()),
                status: Some(JobStatus::Completed),
                ..Default::default()
            },
            anomaly: Anomaly {
                kind: AnomalyKind::OutOfOrder,
                job_id: job_id.to_string(),
                event_kind: "Completed",
                detail: "JobCompleted before JobPosted; created partial record".to_string(),
            },
        };
    };

    match job.result_hash.as_deref() {
        Some(stored) if stored != result_hash => Decision::Conflict(Anomaly {
            kind: AnomalyKind::WriteOnceConflict,
            job_id: job_id.to_string(),
            event_kind: "Completed",
            detail: format!("resultHash: stored `{stored}`, event `{result_hash}`"),
        }),
        Some(_) => {
            if job.status.rank() < JobStatus::Completed.rank() {
                Decision::Apply(JobPatch {
                    status: Some(JobStatus::Completed),
                    ..Default::default()
                })
            } else {
                Decision::Duplicate
            }
        }
        None => {
            if job.status.rank() > JobStatus::Completed.rank() {
                Decision::Stale {
                    patch: JobPatch {
                        result_hash: Some(result_hash.to_string()),
                        ..Default::default()
                    },
                    anomaly: Anomaly {
                        kind: AnomalyKind::StaleTransition,
                        job_id: job_id.to_string(),
                        event_kind: "Completed",
                        detail: format!(
                            "Completed arrived with status `{}`; filled resultHash without regressing",
                            job.status.as_str()
                        ),
                    },
                }
            } else {
                Decision::Apply(JobPatch {
                    result_hash: Some(result_hash.to_string()),
                    status: Some(JobStatus::Completed),
                    ..Default::default()
                })
            }
        }
    }
}

fn plan_paid(current: Option<&Job>, job_id: &str) -> Decision {
    let Some(job) = current else {
        return Decision::OutOfOrder {
            patch: JobPatch {
                status: Some(JobStatus::Paid),
                ..Default::default()
            },
            anomaly: Anomaly {
                kind: AnomalyKind::OutOfOrder,
                job_id: job_id.to_string(),
                event_kind: "Paid",
                detail: "JobPaid before JobPosted; created partial record".to_string(),
            },
        };
    };

    if job.status == JobStatus::Paid {
        Decision::Duplicate
    } else {
        // Paid is the terminal state; reaching it from any earlier
        // status is a forward transition.
        Decision::Apply(JobPatch {
            status: Some(JobStatus::Paid),
            ..Default::default()
        })
    }
}

/// Applies planned decisions to the store and narrates them on the
/// projection event bus.
pub struct Projector {
    store: Arc<dyn JobStore>,
    event_tx: broadcast::Sender<ProjectionEvent>,
}

impl Projector {
    pub fn new(store: Arc<dyn JobStore>, event_tx: broadcast::Sender<ProjectionEvent>) -> Self {
        Self { store, event_tx }
    }

    /// Apply one canonical event.
    ///
    /// Performs at most one store write, so shutdown can interrupt
    /// between events but never mid-record. Anomalies are flagged and
    /// (where safe) the non-destructive part of the update still
    /// lands. A `StoreError` is returned for the caller's per-event
    /// isolation; it never leaves a record half-applied.
    pub async fn apply(&self, event: &JobEvent) -> Result<(), StoreError> {
        let job_id = event.job_id();
        let current = self.store.find_by_job_id(job_id).await?;

        match plan(current.as_ref(), event) {
            Decision::Apply(patch) => {
                self.store.upsert(job_id, &patch).await?;
                tracing::info!(job_id, event_kind = event.kind(), "Applied ledger event");
                self.emit(ProjectionEvent::Applied {
                    job_id: job_id.to_string(),
                    event_kind: event.kind(),
                });
            }
            Decision::Duplicate => {
                tracing::debug!(
                    job_id,
                    event_kind = event.kind(),
                    "Duplicate ledger event, already applied"
                );
                self.emit(ProjectionEvent::Skipped {
                    job_id: job_id.to_string(),
                    event_kind: event.kind(),
                });
            }
            Decision::Conflict(anomaly) => {
                tracing::warn!(
                    job_id,
                    event_kind = event.kind(),
                    detail = %anomaly.detail,
                    "Conflicting ledger event, update not applied"
                );
                self.emit(ProjectionEvent::Anomaly(anomaly));
            }
            Decision::OutOfOrder { patch, anomaly } => {
                self.store.upsert(job_id, &patch).await?;
                tracing::warn!(
                    job_id,
                    event_kind = event.kind(),
                    detail = %anomaly.detail,
                    "Out-of-order ledger event"
                );
                self.emit(ProjectionEvent::Applied {
                    job_id: job_id.to_string(),
                    event_kind: event.kind(),
                });
                self.emit(ProjectionEvent::Anomaly(anomaly));
            }
            Decision::Stale { patch, anomaly } => {
                self.store.upsert(job_id, &patch).await?;
                tracing::warn!(
                    job_id,
                    event_kind = event.kind(),
                    detail = %anomaly.detail,
                    "Stale ledger event"
                );
                self.emit(ProjectionEvent::Anomaly(anomaly));
            }
        }
        Ok(())
    }

    /// Publish a projection event; subscribers may come and go.
    pub(crate) fn emit(&self, event: ProjectionEvent) {
        let _ = self.event_tx.send(event);
    }
}
