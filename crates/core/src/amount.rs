//! Monetary amount helpers.
//!
//! Amounts are integers in the smallest currency unit (e.g. cents). Every
//! monetary comparison in the engine goes through these helpers; raw request
//! values are never used in arithmetic without coercion first.

use serde_json::Value as JsonValue;

/// Monetary amount in smallest currency unit.
pub type Amount = i64;

/// Coerce an untrusted JSON value into an [`Amount`], or return `fallback`.
///
/// Accepts integers, finite floats (rounded), and numeric strings. Never
/// panics and never propagates an error; malformed input yields `fallback`.
pub fn to_amount(raw: &JsonValue, fallback: Amount) -> Amount {
    match raw {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as Amount)
                    .unwrap_or(fallback)
            }
        }
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<Amount>().ok().unwrap_or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as Amount)
                    .unwrap_or(fallback)
            })
        }
        _ => fallback,
    }
}

/// Clamp an amount to zero or above.
pub fn clamp_non_negative(n: Amount) -> Amount {
    n.max(0)
}
