//! Reconnection logic for the gateway subscription.
//!
//! When the subscription drops, the supervisor calls
//! [`reconnect_loop`], which waits out the configured delay and then
//! keeps retrying until either a connection is established or the
//! [`CancellationToken`] fires. Retries are unbounded: giving up would
//! mean the projection silently stops tracking the ledger, which is
//! strictly worse than retrying forever.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{LedgerClient, LedgerConnection};

/// Tunable parameters for the retry delay.
///
/// The default reproduces the reference behavior of a 5-second delay,
/// hardened with capped growth; a `multiplier` of `1.0` gives a fixed
/// delay.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Wait, then reconnect to the gateway, retrying indefinitely.
///
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// the `cancel` token fires first — during the wait or mid-connect.
pub async fn reconnect_loop(
    client: &LedgerClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<LedgerConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(
            contract = client.contract_address(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Re-subscribing to ledger gateway",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(
                            contract = client.contract_address(),
                            attempt,
                            "Ledger subscription re-established",
                        );
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(
                            contract = client.contract_address(),
                            error = %e,
                            "Reconnect attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContractAbi, LedgerConfig};

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        let d = next_delay(Duration::from_secs(5), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(20),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(16), &config);
        assert_eq!(d, Duration::from_secs(20));
    }

    #[test]
    fn multiplier_of_one_keeps_the_delay_fixed() {
        let config = ReconnectConfig {
            multiplier: 1.0,
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(5), &config);
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        let expected = [5, 10, 20, 40, 60, 60];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        // Cancel up front; the loop must return without attempting to
        // connect.
        cancel.cancel();

        let config = LedgerConfig {
            ws_url: "ws://127.0.0.1:1".into(),
            contract_address: "0xCONTRACT".into(),
            abi: ContractAbi::parse(
                r#"[{"type":"event","name":"JobPosted","inputs":[{"name":"jobId","type":"uint256"}]}]"#,
            )
            .unwrap(),
            reconnect: ReconnectConfig::default(),
        };
        let client = LedgerClient::new(&config).unwrap();

        let result = reconnect_loop(&client, &config.reconnect, &cancel).await;
        assert!(result.is_none());
    }
}
