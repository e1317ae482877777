//! Event normalizer: gateway notification → canonical [`JobEvent`].
//!
//! Pure and side-effect free. This is the single place to touch when
//! the contract grows new event kinds.

use gridmart_core::amount::{to_decimal_string, AmountError};
use serde_json::Value;

use crate::events::JobEvent;
use crate::messages::EventNotification;

/// Contract event names this pipeline understands.
pub const KNOWN_EVENTS: [&str; 4] = ["JobPosted", "JobAccepted", "JobCompleted", "JobPaid"];

/// Why a recognized notification could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("event `{event}` is missing argument `{arg}`")]
    MissingArg { event: String, arg: &'static str },

    #[error("argument `{arg}` of `{event}` has an unexpected type")]
    BadArg { event: String, arg: &'static str },

    #[error("argument `{arg}` of `{event}`: {source}")]
    BadAmount {
        event: String,
        arg: &'static str,
        source: AmountError,
    },
}

/// Convert a decoded gateway notification into a canonical event.
///
/// Returns `None` for event names outside [`KNOWN_EVENTS`] — unknown
/// events are ignored so new contract versions never crash the
/// pipeline. Recognized events with missing or mistyped arguments
/// return an error for the caller's per-event error path.
pub fn normalize(n: &EventNotification) -> Option<Result<JobEvent, NormalizeError>> {
    match n.event.as_str() {
        "JobPosted" => Some(normalize_posted(n)),
        "JobAccepted" => Some(normalize_accepted(n)),
        "JobCompleted" => Some(normalize_completed(n)),
        "JobPaid" => Some(job_id(n).map(|job_id| JobEvent::Paid { job_id })),
        _ => None,
    }
}

fn normalize_posted(n: &EventNotification) -> Result<JobEvent, NormalizeError> {
    Ok(JobEvent::Posted {
        job_id: job_id(n)?,
        client: string_arg(n, "client")?,
        price: amount_arg(n, "price")?,
        job_hash: string_arg(n, "jobHash")?,
    })
}

fn normalize_accepted(n: &EventNotification) -> Result<JobEvent, NormalizeError> {
    Ok(JobEvent::Accepted {
        job_id: job_id(n)?,
        provider: string_arg(n, "provider")?,
    })
}

fn normalize_completed(n: &EventNotification) -> Result<JobEvent, NormalizeError> {
    Ok(JobEvent::Completed {
        job_id: job_id(n)?,
        result_hash: string_arg(n, "resultHash")?,
    })
}

/// The ledger assigns numeric job ids; gateways deliver them as either
/// JSON integers or strings. Both normalize to the same string form so
/// replays key identically.
fn job_id(n: &EventNotification) -> Result<String, NormalizeError> {
    string_arg(n, "jobId")
}

fn string_arg(n: &EventNotification, arg: &'static str) -> Result<String, NormalizeError> {
    match n.args.get(arg) {
        None => Err(NormalizeError::MissingArg {
            event: n.event.clone(),
            arg,
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(num)) if num.is_u64() || num.is_i64() => Ok(num.to_string()),
        Some(_) => Err(NormalizeError::BadArg {
            event: n.event.clone(),
            arg,
        }),
    }
}

fn amount_arg(n: &EventNotification, arg: &'static str) -> Result<String, NormalizeError> {
    let value = n.args.get(arg).ok_or_else(|| NormalizeError::MissingArg {
        event: n.event.clone(),
        arg,
    })?;
    to_decimal_string(value).map_err(|source| NormalizeError::BadAmount {
        event: n.event.clone(),
        arg,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn notification(event: &str, args: serde_json::Value) -> EventNotification {
        let Value::Object(args) = args else {
            panic!("args must be an object");
        };
        EventNotification {
            event: event.to_string(),
            args,
            block_number: None,
        }
    }

    #[test]
    fn posted_normalizes_all_fields() {
        let n = notification(
            "JobPosted",
            json!({"jobId": "7", "client": "0xAA", "price": "1000", "jobHash": "Qm123"}),
        );
        let event = normalize(&n).unwrap().unwrap();
        assert_eq!(
            event,
            JobEvent::Posted {
                job_id: "7".into(),
                client: "0xAA".into(),
                price: "1000".into(),
                job_hash: "Qm123".into(),
            }
        );
        assert_eq!(event.kind(), "Posted");
        assert_eq!(event.job_id(), "7");
    }

    #[test]
    fn numeric_job_id_and_price_become_strings() {
        let n = notification(
            "JobPosted",
            json!({"jobId": 7, "client": "0xAA", "price": 1000, "jobHash": "Qm123"}),
        );
        let event = normalize(&n).unwrap().unwrap();
        assert_matches!(event, JobEvent::Posted { job_id, price, .. } => {
            assert_eq!(job_id, "7");
            assert_eq!(price, "1000");
        });
    }

    #[test]
    fn uint256_sized_price_survives_as_string() {
        let big = "340282366920938463463374607431768211455";
        let n = notification(
            "JobPosted",
            json!({"jobId": "1", "client": "0xAA", "price": big, "jobHash": "Qm1"}),
        );
        let event = normalize(&n).unwrap().unwrap();
        assert_matches!(event, JobEvent::Posted { price, .. } => assert_eq!(price, big));
    }

    #[test]
    fn floating_point_price_is_rejected() {
        let n = notification(
            "JobPosted",
            json!({"jobId": "1", "client": "0xAA", "price": 10.5, "jobHash": "Qm1"}),
        );
        assert_matches!(
            normalize(&n),
            Some(Err(NormalizeError::BadAmount { arg: "price", .. }))
        );
    }

    #[test]
    fn accepted_completed_paid_normalize() {
        let accepted = notification("JobAccepted", json!({"jobId": "7", "provider": "0xBB"}));
        assert_eq!(
            normalize(&accepted).unwrap().unwrap(),
            JobEvent::Accepted {
                job_id: "7".into(),
                provider: "0xBB".into()
            }
        );

        let completed =
            notification("JobCompleted", json!({"jobId": "7", "resultHash": "Qm999"}));
        assert_eq!(
            normalize(&completed).unwrap().unwrap(),
            JobEvent::Completed {
                job_id: "7".into(),
                result_hash: "Qm999".into()
            }
        );

        let paid = notification("JobPaid", json!({"jobId": "7"}));
        assert_eq!(
            normalize(&paid).unwrap().unwrap(),
            JobEvent::Paid { job_id: "7".into() }
        );
    }

    #[test]
    fn unknown_events_are_ignored() {
        let n = notification("ProviderRegistered", json!({"provider": "0xBB"}));
        assert!(normalize(&n).is_none());
    }

    #[test]
    fn missing_argument_is_an_error_not_a_panic() {
        let n = notification("JobAccepted", json!({"jobId": "7"}));
        assert_matches!(
            normalize(&n),
            Some(Err(NormalizeError::MissingArg { arg: "provider", .. }))
        );
    }

    #[test]
    fn mistyped_argument_is_an_error() {
        let n = notification("JobAccepted", json!({"jobId": "7", "provider": ["0xBB"]}));
        assert_matches!(
            normalize(&n),
            Some(Err(NormalizeError::BadArg { arg: "provider", .. }))
        );
    }
}
