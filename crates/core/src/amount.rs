//! Decimal-string normalization for on-chain amounts.
//!
//! Token amounts are 256-bit integers on the ledger, far beyond what an
//! `f64` can represent exactly, so they are carried as decimal strings
//! end to end. [`to_decimal_string`] is the single entry point that
//! turns a raw JSON argument into that canonical form.

use serde_json::Value;

/// Why a raw amount argument could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The value is not a non-negative decimal integer.
    #[error("not a non-negative decimal integer: `{0}`")]
    Malformed(String),

    /// The value is floating point, which would lose precision.
    #[error("floating point amount rejected: `{0}`")]
    Float(String),
}

/// Normalize a JSON amount argument to a canonical decimal string.
///
/// Accepts JSON integers and strings of decimal digits (leading zeros
/// are stripped, so `"007"` and `7` both normalize to `"7"`). Floats,
/// negative values, hex strings, and anything non-numeric are rejected
/// rather than rounded.
pub fn to_decimal_string(value: &Value) -> Result<String, AmountError> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else if n.is_f64() {
                Err(AmountError::Float(n.to_string()))
            } else {
                // i64 that did not fit u64, i.e. negative
                Err(AmountError::Malformed(n.to_string()))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AmountError::Malformed(s.clone()));
            }
            let canonical = trimmed.trim_start_matches('0');
            if canonical.is_empty() {
                Ok("0".to_string())
            } else {
                Ok(canonical.to_string())
            }
        }
        other => Err(AmountError::Malformed(other.to_string())),
    }
}
