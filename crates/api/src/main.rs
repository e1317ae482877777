use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gridmart_api::config::ServerConfig;
use gridmart_api::router::build_app_router;
use gridmart_api::state::AppState;
use gridmart_ledger::config::LedgerConfig;
use gridmart_ledger::manager::LedgerManager;
use gridmart_ledger::persistence::AnomalyPersistence;
use gridmart_ledger::store::{JobStore, PgJobStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridmart=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = gridmart_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    gridmart_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    gridmart_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Ledger subscription ---
    // Absent configuration disables the subsystem (already logged);
    // malformed configuration disables it with a diagnostic. Neither is
    // retried, and neither stops the read API from serving whatever
    // projection exists.
    let ledger = match LedgerConfig::from_env() {
        Ok(Some(ledger_config)) => {
            let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
            match LedgerManager::start(ledger_config, store) {
                Ok(manager) => {
                    tokio::spawn(AnomalyPersistence::run(pool.clone(), manager.subscribe()));
                    tracing::info!("Ledger subscription started");
                    Some(manager)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Invalid ledger configuration — subscription disabled");
                    None
                }
            }
        }
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, "Malformed ledger configuration — subscription disabled");
            None
        }
    };

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ledger: ledger.clone(),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the ledger subscription first so no event handler runs
    // against a torn-down pool. An in-flight handler finishes its
    // single store write before the task exits.
    if let Some(manager) = ledger {
        manager.shutdown().await;
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
