use std::sync::Arc;

use gridmart_ledger::manager::LedgerManager;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gridmart_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Ledger subscription supervisor; `None` when the subsystem is
    /// disabled by configuration.
    pub ledger: Option<Arc<LedgerManager>>,
}
