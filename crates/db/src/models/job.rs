//! Job projection models.

use gridmart_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a marketplace job as enforced by the contract.
///
/// `AwaitingConfirmation` is reachable only through an external
/// confirmation step; none of the ledger events listened to here
/// produce it, but a record may already hold it when an event arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    AwaitingConfirmation,
    Paid,
}

impl JobStatus {
    /// Position along the forward-only lifecycle. The projector never
    /// moves a job to a lower rank.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::InProgress => 1,
            JobStatus::Completed => 2,
            JobStatus::AwaitingConfirmation => 3,
            JobStatus::Paid => 4,
        }
    }

    /// The stored (and serialized) representation.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::AwaitingConfirmation => "awaiting_confirmation",
            JobStatus::Paid => "paid",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "awaiting_confirmation" => Some(JobStatus::AwaitingConfirmation),
            "paid" => Some(JobStatus::Paid),
            _ => None,
        }
    }
}

// Stored as TEXT; the CHECK constraint in 0001_create_jobs.sql mirrors
// `parse`.
impl sqlx::Type<sqlx::Postgres> for JobStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for JobStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'_, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Self::parse(s).ok_or_else(|| format!("unknown job status `{s}`").into())
    }
}

/// A row from the `jobs` table — the local projection of one job.
///
/// `client`, `price`, and `job_hash` are nullable because an
/// out-of-order event may create a best-effort partial record before
/// the creation event is seen; they remain write-once in the
/// projector's merge semantics.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_id: String,
    pub client: Option<String>,
    pub price: Option<String>,
    pub job_hash: Option<String>,
    pub accepted_by: Option<String>,
    pub result_hash: Option<String>,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Partial-field update applied by the projector.
///
/// `None` fields are left untouched by the upsert; a fresh row is
/// inserted when the `job_id` has not been seen before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub client: Option<String>,
    pub price: Option<String>,
    pub job_hash: Option<String>,
    pub accepted_by: Option<String>,
    pub result_hash: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        *self == JobPatch::default()
    }
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by lifecycle status (e.g. `pending`, `in_progress`).
    pub status: Option<JobStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::AwaitingConfirmation,
            JobStatus::Paid,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("shipped"), None);
    }

    #[test]
    fn rank_orders_the_lifecycle() {
        assert!(JobStatus::Pending.rank() < JobStatus::InProgress.rank());
        assert!(JobStatus::InProgress.rank() < JobStatus::Completed.rank());
        assert!(JobStatus::Completed.rank() < JobStatus::AwaitingConfirmation.rank());
        assert!(JobStatus::AwaitingConfirmation.rank() < JobStatus::Paid.rank());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(JobPatch::default().is_empty());
        let patch = JobPatch {
            status: Some(JobStatus::Paid),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
