//! Request handlers, one module per resource.

pub mod anomalies;
pub mod jobs;
pub mod status;
