//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod anomaly_repo;
pub mod job_repo;

pub use anomaly_repo::AnomalyRepo;
pub use job_repo::JobRepo;
