//! WebSocket client for the ledger gateway.
//!
//! [`LedgerClient`] holds the validated subscription parameters for a
//! single contract. Call [`LedgerClient::connect`] to establish a live
//! [`LedgerConnection`]. The client never retries; that is the
//! supervisor's job (see [`crate::reconnect`] and [`crate::manager`]).

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use crate::config::LedgerConfig;
use crate::normalize::KNOWN_EVENTS;

/// Validated subscription parameters for one contract.
#[derive(Debug)]
pub struct LedgerClient {
    ws_url: String,
    contract_address: String,
    event_names: Vec<String>,
}

/// A live subscription to the ledger gateway.
pub struct LedgerConnection {
    /// Unique client id sent with the subscribe request.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl LedgerClient {
    /// Validate the configuration and build a client.
    ///
    /// Fails fast on malformed parameters — a bad endpoint scheme, an
    /// empty contract address, or an interface that declares none of
    /// the job events. There is nothing to retry in any of those cases.
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerClientError> {
        if !config.ws_url.starts_with("ws://") && !config.ws_url.starts_with("wss://") {
            return Err(LedgerClientError::Config(format!(
                "ledger endpoint must be a ws:// or wss:// URL, got `{}`",
                config.ws_url
            )));
        }
        if config.contract_address.trim().is_empty() {
            return Err(LedgerClientError::Config(
                "contract address is empty".to_string(),
            ));
        }
        if !KNOWN_EVENTS.iter().any(|name| config.abi.declares(name)) {
            return Err(LedgerClientError::Config(format!(
                "contract interface declares none of the job events {KNOWN_EVENTS:?}"
            )));
        }

        Ok(Self {
            ws_url: config.ws_url.clone(),
            contract_address: config.contract_address.clone(),
            event_names: config.abi.event_names(),
        })
    }

    /// The contract address this client subscribes to.
    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    /// Connect to the gateway and send the subscribe request.
    ///
    /// Generates a unique `client_id` (UUID v4) so the gateway can
    /// address acks back to this specific subscriber.
    pub async fn connect(&self) -> Result<LedgerConnection, LedgerClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();

        let (mut ws_stream, _response) = connect_async(&self.ws_url).await.map_err(|e| {
            LedgerClientError::Connection(format!(
                "failed to connect to ledger gateway at {}: {e}",
                self.ws_url
            ))
        })?;

        let subscribe = serde_json::json!({
            "op": "subscribe",
            "contract": self.contract_address,
            "events": self.event_names,
            "client_id": client_id,
        });
        ws_stream
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|e| {
                LedgerClientError::Subscribe(format!("failed to send subscribe request: {e}"))
            })?;

        tracing::info!(
            contract = %self.contract_address,
            client_id = %client_id,
            "Subscribed to ledger events at {}",
            self.ws_url,
        );

        Ok(LedgerConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the gateway client.
#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    /// Malformed subscription parameters. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to establish the WebSocket connection. Transient.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connected but could not send the subscribe request. Transient.
    #[error("Subscribe error: {0}")]
    Subscribe(String),
}

impl LedgerClientError {
    /// Whether the supervisor should retry after this error.
    pub fn is_transient(&self) -> bool {
        !matches!(self, LedgerClientError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractAbi;
    use crate::reconnect::ReconnectConfig;

    fn config_with(ws_url: &str, address: &str, abi_json: &str) -> LedgerConfig {
        LedgerConfig {
            ws_url: ws_url.to_string(),
            contract_address: address.to_string(),
            abi: ContractAbi::parse(abi_json).unwrap(),
            reconnect: ReconnectConfig::default(),
        }
    }

    const JOB_ABI: &str =
        r#"[{"type":"event","name":"JobPosted","inputs":[{"name":"jobId","type":"uint256"}]}]"#;

    #[test]
    fn rejects_non_websocket_endpoint() {
        let config = config_with("http://gateway:9944", "0xCONTRACT", JOB_ABI);
        let err = LedgerClient::new(&config).unwrap_err();
        assert!(matches!(err, LedgerClientError::Config(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn rejects_empty_contract_address() {
        let config = config_with("ws://gateway:9944", "  ", JOB_ABI);
        assert!(matches!(
            LedgerClient::new(&config),
            Err(LedgerClientError::Config(_))
        ));
    }

    #[test]
    fn rejects_interface_without_job_events() {
        let abi = r#"[{"type":"event","name":"Transfer","inputs":[]}]"#;
        let config = config_with("ws://gateway:9944", "0xCONTRACT", abi);
        assert!(matches!(
            LedgerClient::new(&config),
            Err(LedgerClientError::Config(_))
        ));
    }

    #[test]
    fn accepts_valid_configuration() {
        let config = config_with("wss://gateway:9944", "0xCONTRACT", JOB_ABI);
        let client = LedgerClient::new(&config).unwrap();
        assert_eq!(client.contract_address(), "0xCONTRACT");
    }
}
