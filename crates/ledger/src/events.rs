//! Canonical job events and the projection event bus payloads.

use serde::Serialize;

use crate::projector::Anomaly;

/// A contract event in canonical, wire-format-independent form.
///
/// Produced by [`crate::normalize::normalize`]; everything downstream
/// of the normalizer works only with these. Numeric amounts are decimal
/// strings (see [`gridmart_core::amount`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A client posted a new job.
    Posted {
        job_id: String,
        client: String,
        price: String,
        job_hash: String,
    },

    /// A provider accepted the job.
    Accepted { job_id: String, provider: String },

    /// The provider produced a result.
    Completed { job_id: String, result_hash: String },

    /// The client's payment settled.
    Paid { job_id: String },
}

impl JobEvent {
    /// Stable kind tag, used in logs and anomaly records.
    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Posted { .. } => "Posted",
            JobEvent::Accepted { .. } => "Accepted",
            JobEvent::Completed { .. } => "Completed",
            JobEvent::Paid { .. } => "Paid",
        }
    }

    /// The job this event belongs to.
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Posted { job_id, .. }
            | JobEvent::Accepted { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Paid { job_id } => job_id,
        }
    }
}

/// Operator-visible projection events, published on the manager's
/// broadcast channel.
///
/// Every failure mode of the pipeline degrades to one of these plus a
/// log line — nothing is silent, nothing kills the process.
#[derive(Debug, Clone, Serialize)]
pub enum ProjectionEvent {
    /// The gateway subscription was established.
    SubscriptionConnected,

    /// The gateway subscription dropped; the supervisor is retrying.
    SubscriptionLost,

    /// An event was applied to the store.
    Applied {
        job_id: String,
        event_kind: &'static str,
    },

    /// An event was recognized but intentionally not applied
    /// (idempotent replay).
    Skipped {
        job_id: String,
        event_kind: &'static str,
    },

    /// A data or sequencing anomaly was detected.
    Anomaly(Anomaly),

    /// The store rejected an update; the raw frame is carried for
    /// replay.
    StoreFailed {
        job_id: String,
        event_kind: &'static str,
        raw: String,
        error: String,
    },
}
