//! Subscription supervisor.
//!
//! [`LedgerManager`] owns the one live gateway connection for the
//! process: it validates the configuration up front, spawns the
//! connect → process → reconnect task, and exposes the projection
//! event bus plus a graceful [`shutdown`](LedgerManager::shutdown).
//! Transient failures are retried forever; configuration errors are
//! returned from [`start`](LedgerManager::start) and never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::client::{LedgerClient, LedgerClientError};
use crate::config::LedgerConfig;
use crate::events::ProjectionEvent;
use crate::processor::process_messages;
use crate::projector::Projector;
use crate::reconnect::{reconnect_loop, ReconnectConfig};
use crate::store::JobStore;

/// Broadcast channel capacity for projection events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Supervises the ledger subscription for the process lifetime.
pub struct LedgerManager {
    event_tx: broadcast::Sender<ProjectionEvent>,
    /// Master cancellation token — cancelled during shutdown.
    cancel: CancellationToken,
    task_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    connected: Arc<AtomicBool>,
}

impl LedgerManager {
    /// Validate the configuration and start the connection task.
    ///
    /// Fails fast with [`LedgerClientError::Config`] on malformed
    /// parameters — the caller disables the subsystem with a
    /// diagnostic instead of retrying. On success the returned handle
    /// is safe to clone into request handlers.
    pub fn start(
        config: LedgerConfig,
        store: Arc<dyn JobStore>,
    ) -> Result<Arc<Self>, LedgerClientError> {
        let client = LedgerClient::new(&config)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let connected = Arc::new(AtomicBool::new(false));

        let projector = Projector::new(store, event_tx.clone());
        let task_cancel = cancel.child_token();
        let task_tx = event_tx.clone();
        let task_connected = Arc::clone(&connected);
        let reconnect = config.reconnect.clone();

        let task_handle = tokio::spawn(async move {
            tracing::info!(
                contract = client.contract_address(),
                "Starting ledger connection task",
            );
            run_connection_loop(
                &client,
                &projector,
                &reconnect,
                &task_cancel,
                &task_tx,
                &task_connected,
            )
            .await;
            tracing::info!("Ledger connection task exited");
        });

        Ok(Arc::new(Self {
            event_tx,
            cancel,
            task_handle: Mutex::new(Some(task_handle)),
            connected,
        }))
    }

    /// Subscribe to projection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProjectionEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the gateway subscription is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Gracefully stop the connection task.
    ///
    /// Cancels the master token — an in-flight event handler finishes
    /// its single store write first — then waits up to 5 seconds for a
    /// clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down ledger subscription");
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }

        tracing::info!("Ledger subscription shut down");
    }
}

/// Core connection loop: connect → process messages → reconnect.
///
/// Runs until the cancellation token fires. The first attempt connects
/// immediately; every later attempt goes through the supervisor delay
/// in [`reconnect_loop`].
async fn run_connection_loop(
    client: &LedgerClient,
    projector: &Projector,
    reconnect: &ReconnectConfig,
    cancel: &CancellationToken,
    event_tx: &broadcast::Sender<ProjectionEvent>,
    connected: &AtomicBool,
) {
    let mut first_attempt = true;

    loop {
        let conn = if first_attempt {
            first_attempt = false;
            match client.connect().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Initial ledger connection failed, entering reconnect loop",
                    );
                    match reconnect_loop(client, reconnect, cancel).await {
                        Some(conn) => conn,
                        None => return, // cancelled
                    }
                }
            }
        } else {
            match reconnect_loop(client, reconnect, cancel).await {
                Some(conn) => conn,
                None => return, // cancelled
            }
        };

        connected.store(true, Ordering::Relaxed);
        let _ = event_tx.send(ProjectionEvent::SubscriptionConnected);

        // Process messages until the connection drops or we are
        // cancelled.
        let mut ws_stream = conn.ws_stream;
        process_messages(&mut ws_stream, projector, cancel).await;

        connected.store(false, Ordering::Relaxed);
        let _ = event_tx.send(ProjectionEvent::SubscriptionLost);

        if cancel.is_cancelled() {
            return;
        }

        tracing::info!("Ledger connection lost, entering reconnect loop");
    }
}
