//! Store seam used by the projector.
//!
//! The projector only ever needs two operations — a point read and an
//! atomic per-key merge-upsert — so that is the whole trait. Production
//! uses [`PgJobStore`] over the repository layer; tests use
//! [`MemoryJobStore`], which implements the same merge semantics
//! without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use gridmart_db::models::job::{Job, JobPatch, JobStatus};
use gridmart_db::repositories::JobRepo;
use gridmart_db::DbPool;

/// The store could not serve a request.
///
/// Carried as a message rather than a source chain so fakes and the
/// Postgres implementation share one shape.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Keyed, per-job-atomic persistence for the projection.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Current record for `job_id`, if any.
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Atomic merge-upsert for one `job_id`: insert when absent, fill
    /// exactly the patch's fields when present.
    async fn upsert(&self, job_id: &str, patch: &JobPatch) -> Result<Job, StoreError>;
}

/// Postgres-backed job store (production).
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_job_id(&self.pool, job_id).await?)
    }

    async fn upsert(&self, job_id: &str, patch: &JobPatch) -> Result<Job, StoreError> {
        Ok(JobRepo::upsert(&self.pool, job_id, patch).await?)
    }
}

/// In-memory job store with the same merge semantics as the SQL upsert.
///
/// Used by unit and integration tests, and handy for running the
/// pipeline locally without Postgres.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<HashMap<String, Job>>,
    next_id: AtomicI64,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, newest-created first (reader ordering).
    pub fn snapshot(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .inner
            .lock()
            .expect("job store mutex poisoned")
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self
            .inner
            .lock()
            .expect("job store mutex poisoned")
            .get(job_id)
            .cloned())
    }

    async fn upsert(&self, job_id: &str, patch: &JobPatch) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().expect("job store mutex poisoned");
        let now = chrono::Utc::now();

        let job = inner
            .entry(job_id.to_string())
            .and_modify(|job| {
                merge(job, patch);
                job.updated_at = now;
            })
            .or_insert_with(|| Job {
                id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                job_id: job_id.to_string(),
                client: patch.client.clone(),
                price: patch.price.clone(),
                job_hash: patch.job_hash.clone(),
                accepted_by: patch.accepted_by.clone(),
                result_hash: patch.result_hash.clone(),
                status: patch.status.unwrap_or(JobStatus::Pending),
                created_at: now,
                updated_at: now,
            });
        Ok(job.clone())
    }
}

/// `COALESCE(EXCLUDED.x, jobs.x)` in Rust: patch fields win only when
/// present.
fn merge(job: &mut Job, patch: &JobPatch) {
    if let Some(client) = &patch.client {
        job.client = Some(client.clone());
    }
    if let Some(price) = &patch.price {
        job.price = Some(price.clone());
    }
    if let Some(job_hash) = &patch.job_hash {
        job.job_hash = Some(job_hash.clone());
    }
    if let Some(accepted_by) = &patch.accepted_by {
        job.accepted_by = Some(accepted_by.clone());
    }
    if let Some(result_hash) = &patch.result_hash {
        job.result_hash = Some(result_hash.clone());
    }
    if let Some(status) = patch.status {
        job.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_inserts_and_merges() {
        let store = MemoryJobStore::new();
        let inserted = store
            .upsert(
                "7",
                &JobPatch {
                    client: Some("0xAA".into()),
                    price: Some("1000".into()),
                    status: Some(JobStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(inserted.status, JobStatus::Pending);

        let updated = store
            .upsert(
                "7",
                &JobPatch {
                    accepted_by: Some("0xBB".into()),
                    status: Some(JobStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.client.as_deref(), Some("0xAA"));
        assert_eq!(updated.accepted_by.as_deref(), Some("0xBB"));
        assert_eq!(updated.created_at, inserted.created_at);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn memory_store_defaults_status_to_pending() {
        let store = MemoryJobStore::new();
        let job = store.upsert("1", &JobPatch::default()).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }
}
