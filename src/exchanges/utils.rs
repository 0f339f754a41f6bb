//! Common utilities for exchange adapters.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Converts a JSON string or number into a Decimal.
///
/// Exchanges disagree on whether prices are quoted (`"42000.5"`) or bare
/// (`42000.5`). Numbers are converted through their textual form so the
/// digits in the response are kept as written.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Parses plain or scientific decimal notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Returns the first element of the array stored under `key`.
pub fn first_in<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key)?.as_array()?.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_from_string() {
        assert_eq!(
            decimal_from_value(&json!("42000.50")),
            Some(Decimal::new(4200050, 2))
        );
    }

    #[test]
    fn test_decimal_from_number() {
        assert_eq!(
            decimal_from_value(&json!(42000.5)),
            Some(Decimal::new(420005, 1))
        );
        assert_eq!(decimal_from_value(&json!(7)), Some(Decimal::new(7, 0)));
    }

    #[test]
    fn test_decimal_from_scientific_number() {
        assert_eq!(
            decimal_from_value(&json!("1.2e-5")),
            Some(Decimal::new(12, 6))
        );
    }

    #[test]
    fn test_decimal_from_invalid() {
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!(null)), None);
        assert_eq!(decimal_from_value(&json!(true)), None);
        assert_eq!(decimal_from_value(&json!([1])), None);
    }

    #[test]
    fn test_first_in() {
        let v = json!({"data": [{"last": "1"}, {"last": "2"}]});
        assert_eq!(first_in(&v, "data"), Some(&json!({"last": "1"})));
        assert_eq!(first_in(&json!({"data": []}), "data"), None);
        assert_eq!(first_in(&json!({"data": {}}), "data"), None);
    }
}
