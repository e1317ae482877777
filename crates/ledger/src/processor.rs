//! Subscription message loop.
//!
//! Reads raw frames from a gateway connection, parses them into typed
//! [`LedgerMessage`]s, normalizes contract events, and hands them to
//! the [`Projector`]. Every failure below the transport level is
//! isolated to the frame that caused it; only connection loss (or
//! cancellation) ends the loop, and the supervisor deals with that.

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::events::ProjectionEvent;
use crate::messages::{parse_message, LedgerMessage};
use crate::normalize::normalize;
use crate::projector::Projector;

/// Process gateway frames until the connection drops or `cancel` fires.
///
/// Frames are handled strictly in arrival order, one at a time. The
/// cancellation check sits between frames, so an in-flight event
/// handler always runs to completion and no record is left
/// half-applied.
pub async fn process_messages(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    projector: &Projector,
    cancel: &CancellationToken,
) {
    loop {
        let msg_result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger message processing cancelled");
                return;
            }
            frame = ws_stream.next() => match frame {
                Some(result) => result,
                None => {
                    tracing::info!("Ledger gateway stream ended");
                    return;
                }
            },
        };

        match msg_result {
            Ok(Message::Text(text)) => {
                handle_text_message(&text, projector).await;
            }
            Ok(Message::Binary(_)) => {
                // The gateway protocol is text-only.
                tracing::trace!("Ignoring binary frame from ledger gateway");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Ledger gateway closed the connection");
                return;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Ledger WebSocket receive error");
                return;
            }
        }
    }
}

/// Dispatch a single text frame.
async fn handle_text_message(text: &str, projector: &Projector) {
    match parse_message(text) {
        Ok(LedgerMessage::Event(notification)) => match normalize(&notification) {
            Some(Ok(event)) => {
                if let Err(e) = projector.apply(&event).await {
                    // The raw frame goes into the log and onto the bus
                    // so the update can be replayed once the store is
                    // back.
                    tracing::error!(
                        job_id = event.job_id(),
                        event_kind = event.kind(),
                        raw = %text,
                        error = %e,
                        "Failed to apply ledger event; projection is stale for this job until replay",
                    );
                    projector.emit(ProjectionEvent::StoreFailed {
                        job_id: event.job_id().to_string(),
                        event_kind: event.kind(),
                        raw: text.to_string(),
                        error: e.to_string(),
                    });
                }
            }
            Some(Err(e)) => {
                tracing::warn!(
                    event = %notification.event,
                    raw = %text,
                    error = %e,
                    "Failed to normalize ledger event",
                );
            }
            None => {
                tracing::debug!(
                    event = %notification.event,
                    "Ignoring unrecognized contract event",
                );
            }
        },
        Ok(LedgerMessage::Subscribed(data)) => {
            tracing::info!(
                subscription_id = %data.subscription_id,
                "Ledger subscription acknowledged",
            );
        }
        Ok(LedgerMessage::Error(data)) => {
            tracing::warn!(message = %data.message, "Ledger gateway reported an error");
        }
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "Failed to parse ledger message");
        }
    }
}
