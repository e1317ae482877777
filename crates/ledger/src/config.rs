//! Subscription configuration.
//!
//! The ledger subsystem is configured through an explicit
//! [`LedgerConfig`] passed to [`LedgerManager::start`](crate::manager::LedgerManager::start),
//! so tests can run multiple independent instances.
//! [`LedgerConfig::from_env`] is the production loader: all three
//! subscription parameters are required, and their absence disables the
//! subsystem (a warning, not a crash), while a present-but-malformed
//! value is a fatal configuration error that is never retried.

use serde::Deserialize;

use crate::reconnect::ReconnectConfig;

/// Environment variable holding the gateway WebSocket URL.
pub const ENV_WS_URL: &str = "LEDGER_WS_URL";
/// Environment variable holding the marketplace contract address.
pub const ENV_CONTRACT_ADDRESS: &str = "LEDGER_CONTRACT_ADDRESS";
/// Environment variable holding the contract interface JSON.
pub const ENV_CONTRACT_ABI: &str = "LEDGER_CONTRACT_ABI";
/// Environment variable overriding the reconnect delay (seconds).
pub const ENV_RECONNECT_DELAY_SECS: &str = "LEDGER_RECONNECT_DELAY_SECS";

/// Everything needed to hold one contract subscription.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Gateway WebSocket endpoint, `ws://` or `wss://`.
    pub ws_url: String,
    /// Address of the marketplace contract to subscribe to.
    pub contract_address: String,
    /// Interface description of the contract's events.
    pub abi: ContractAbi,
    /// Supervisor retry behavior.
    pub reconnect: ReconnectConfig,
}

/// A present-but-malformed subscription parameter.
#[derive(Debug, thiserror::Error)]
pub enum LedgerConfigError {
    #[error("failed to parse {ENV_CONTRACT_ABI}: {0}")]
    Abi(#[from] serde_json::Error),

    #[error("invalid {ENV_RECONNECT_DELAY_SECS}: {0}")]
    ReconnectDelay(std::num::ParseIntError),
}

impl LedgerConfig {
    /// Load the subscription configuration from the environment.
    ///
    /// Returns `Ok(None)` when any of the three required parameters is
    /// absent — the subsystem is then disabled for the process
    /// lifetime, which is logged here exactly once. Malformed values
    /// return an error instead; retrying those can never succeed.
    pub fn from_env() -> Result<Option<Self>, LedgerConfigError> {
        let ws_url = std::env::var(ENV_WS_URL).ok();
        let contract_address = std::env::var(ENV_CONTRACT_ADDRESS).ok();
        let abi_json = std::env::var(ENV_CONTRACT_ABI).ok();

        let (Some(ws_url), Some(contract_address), Some(abi_json)) =
            (ws_url, contract_address, abi_json)
        else {
            tracing::warn!(
                "{ENV_WS_URL}, {ENV_CONTRACT_ADDRESS} or {ENV_CONTRACT_ABI} missing — \
                 ledger subscription disabled"
            );
            return Ok(None);
        };

        let abi = ContractAbi::parse(&abi_json)?;

        let mut reconnect = ReconnectConfig::default();
        if let Ok(raw) = std::env::var(ENV_RECONNECT_DELAY_SECS) {
            let secs: u64 = raw.parse().map_err(LedgerConfigError::ReconnectDelay)?;
            reconnect.initial_delay = std::time::Duration::from_secs(secs);
        }

        Ok(Some(Self {
            ws_url,
            contract_address,
            abi,
            reconnect,
        }))
    }
}

/// Parsed contract interface: the event declarations only.
///
/// The accepted JSON is the usual interface-description array; entries
/// whose `type` is not `"event"` are skipped.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    pub events: Vec<AbiEvent>,
}

/// One event declaration from the interface description.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiEvent {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
}

/// One named event argument.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiInput {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiInput>,
}

impl ContractAbi {
    /// Parse an interface-description JSON array.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)?;
        let events = entries
            .into_iter()
            .filter(|e| e.kind == "event")
            .map(|e| AbiEvent {
                name: e.name,
                inputs: e.inputs,
            })
            .collect();
        Ok(Self { events })
    }

    /// Names of all declared events, in declaration order.
    pub fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|e| e.name.clone()).collect()
    }

    /// Whether the interface declares an event with the given name.
    pub fn declares(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }
}
