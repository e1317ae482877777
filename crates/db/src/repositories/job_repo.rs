//! Repository for the `jobs` projection table.

use sqlx::PgPool;

use crate::models::job::{Job, JobListQuery, JobPatch, JobStatus};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_id, client, price, job_hash, accepted_by, result_hash, \
    status, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Read and merge-write operations on the job projection.
pub struct JobRepo;

impl JobRepo {
    /// Atomic merge-upsert for a single `job_id`.
    ///
    /// Inserts a fresh row when the job has not been seen; otherwise
    /// fills exactly the fields present in `patch`, leaving the rest
    /// untouched. One statement, so concurrent deliveries for the same
    /// key cannot interleave partial writes.
    pub async fn upsert(
        pool: &PgPool,
        job_id: &str,
        patch: &JobPatch,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (job_id, client, price, job_hash, accepted_by, result_hash, status) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'pending')) \
             ON CONFLICT (job_id) DO UPDATE SET \
                 client = COALESCE(EXCLUDED.client, jobs.client), \
                 price = COALESCE(EXCLUDED.price, jobs.price), \
                 job_hash = COALESCE(EXCLUDED.job_hash, jobs.job_hash), \
                 accepted_by = COALESCE(EXCLUDED.accepted_by, jobs.accepted_by), \
                 result_hash = COALESCE(EXCLUDED.result_hash, jobs.result_hash), \
                 status = COALESCE($7, jobs.status), \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(&patch.client)
            .bind(&patch.price)
            .bind(&patch.job_hash)
            .bind(&patch.accepted_by)
            .bind(&patch.result_hash)
            .bind(patch.status)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ledger-assigned id.
    pub async fn find_by_job_id(
        pool: &PgPool,
        job_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE job_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs, newest-created first, with optional status filter and
    /// pagination.
    pub async fn list(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        match params.status {
            Some(status) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM jobs WHERE status = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
                );
                sqlx::query_as::<_, Job>(&query)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM jobs \
                     ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
                );
                sqlx::query_as::<_, Job>(&query)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Count jobs currently in the given status.
    pub async fn count_by_status(
        pool: &PgPool,
        status: JobStatus,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
