//! Ledger gateway wire messages and parser.
//!
//! The gateway sends JSON text frames shaped
//! `{"type": "<kind>", "data": {...}}`. This module deserializes them
//! into a strongly-typed [`LedgerMessage`] enum; the contract-event
//! payload stays as raw JSON until [`crate::normalize`] turns it into a
//! canonical event.

use serde::Deserialize;

/// All known gateway message types.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LedgerMessage {
    /// The subscribe request was accepted.
    Subscribed(SubscribedData),

    /// One decoded contract event notification.
    Event(EventNotification),

    /// A gateway-side error notice (the connection stays up).
    Error(ErrorData),
}

/// Payload of `subscribed` acks.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedData {
    pub subscription_id: String,
    #[serde(default)]
    pub contract: Option<String>,
}

/// Payload of `event` notifications: one contract event, decoded by the
/// gateway against the interface description.
#[derive(Debug, Clone, Deserialize)]
pub struct EventNotification {
    /// Contract event name as declared in the interface (e.g. `JobPosted`).
    pub event: String,
    /// Decoded event arguments, keyed by declared input name.
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    /// Originating block number, when the gateway provides it.
    #[serde(default)]
    pub block_number: Option<u64>,
}

/// Payload of `error` notices.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

/// Parse a gateway text frame into a typed message.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// log and continue; a bad frame must never take the subscription down.
pub fn parse_message(text: &str) -> Result<LedgerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
