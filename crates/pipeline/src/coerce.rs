//! Primitive coercion from upstream JSON values.
//!
//! Upstream rows mix numbers, numeric-looking strings, nulls, and empty
//! strings for the same logical field. Everything funnels through these
//! helpers so that a value which fails to parse becomes `None` — NaN and
//! infinities never reach a canonical record.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parses a JSON value into a `Decimal`, accepting numbers and
/// numeric-looking strings (including scientific notation).
#[must_use]
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                parse_decimal(trimmed)
            }
        }
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// Parses a JSON value into a finite `f64`; NaN and infinities become `None`.
#[must_use]
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parses a `%Y-%m-%d` date, tolerating a trailing time component
/// (upstream mixes plain dates and full timestamps).
#[must_use]
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let raw = match value {
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}

/// Extracts a non-empty string, rendering bare numbers as text.
#[must_use]
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decimal_from_number_and_string() {
        assert_eq!(coerce_decimal(&json!(105.5)), Some(dec!(105.5)));
        assert_eq!(coerce_decimal(&json!("105.5")), Some(dec!(105.5)));
        assert_eq!(coerce_decimal(&json!("  7900.1 ")), Some(dec!(7900.1)));
    }

    #[test]
    fn decimal_scientific_notation() {
        assert_eq!(coerce_decimal(&json!("1.5e2")), Some(dec!(150)));
    }

    #[test]
    fn decimal_rejects_garbage() {
        assert_eq!(coerce_decimal(&json!("")), None);
        assert_eq!(coerce_decimal(&json!("N/A")), None);
        assert_eq!(coerce_decimal(&json!(null)), None);
        assert_eq!(coerce_decimal(&json!(true)), None);
        assert_eq!(coerce_decimal(&json!("NaN")), None);
    }

    #[test]
    fn f64_never_yields_non_finite() {
        assert_eq!(coerce_f64(&json!("inf")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(87.3)), Some(87.3));
    }

    #[test]
    fn date_accepts_plain_and_timestamped() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(coerce_date(&json!("2025-03-14")), Some(expected));
        assert_eq!(coerce_date(&json!("2025-03-14T16:30:00Z")), Some(expected));
        assert_eq!(coerce_date(&json!("last week")), None);
        assert_eq!(coerce_date(&json!(20250314)), None);
    }
}
