//! Tolerant response parsing
//!
//! The brokerage returns the same information in several shapes depending on
//! tenant and endpoint version. Each shape is handled by one pure
//! `&Value -> Option<T>` strategy; callers try strategies in order and take
//! the first hit. Supporting a new shape means adding a strategy.

use serde_json::Value;

/// A single extraction strategy
pub type Strategy<T> = fn(&Value) -> Option<T>;

/// Field names that may carry the available cash amount
pub const FUNDS_FIELDS: &[&str] = &["available", "availableCash", "cash", "netAvailable", "netCash", "limit"];

/// Field names that may carry the day's profit
pub const PROFIT_FIELDS: &[&str] = &["dayProfit", "day_profit", "pnl", "realizedPnl", "mtm"];

/// Funds: bare number, then top level, then `data`, then `limits`
pub const FUNDS_STRATEGIES: &[Strategy<f64>] = &[bare_number, funds_top_level, funds_in_data, funds_in_limits];

pub const PROFIT_STRATEGIES: &[Strategy<f64>] = &[bare_number, profit_top_level, profit_in_data, profit_in_limits];

/// Lists: bare array, then array under `data`
pub const LIST_STRATEGIES: &[Strategy<Vec<Value>>] = &[bare_list, list_in_data];

/// Order acknowledgement id, top level then under `data`
pub const ORDER_ID_STRATEGIES: &[Strategy<String>] = &[order_id_top_level, order_id_in_data];

const ORDER_ID_FIELDS: &[&str] = &["order_id", "orderId", "nOrdNo", "id"];

/// Run strategies in order and return the first match
pub fn first_match<T>(payload: &Value, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(payload))
}

/// A JSON number, or a string holding one
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string, or a number rendered as one (ids often arrive numeric)
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First of `fields` present on an object that parses as a number
pub fn first_number(value: &Value, fields: &[&str]) -> Option<f64> {
    let object = value.as_object()?;
    fields.iter().find_map(|f| object.get(*f).and_then(as_number))
}

pub fn first_string(value: &Value, fields: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    fields.iter().find_map(|f| object.get(*f).and_then(as_text))
}

fn bare_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn funds_top_level(value: &Value) -> Option<f64> {
    first_number(value, FUNDS_FIELDS)
}

fn funds_in_data(value: &Value) -> Option<f64> {
    first_number(value.get("data")?, FUNDS_FIELDS)
}

fn funds_in_limits(value: &Value) -> Option<f64> {
    first_number(value.get("limits")?, FUNDS_FIELDS)
}

fn profit_top_level(value: &Value) -> Option<f64> {
    first_number(value, PROFIT_FIELDS)
}

fn profit_in_data(value: &Value) -> Option<f64> {
    first_number(value.get("data")?, PROFIT_FIELDS)
}

fn profit_in_limits(value: &Value) -> Option<f64> {
    first_number(value.get("limits")?, PROFIT_FIELDS)
}

fn bare_list(value: &Value) -> Option<Vec<Value>> {
    value.as_array().cloned()
}

fn list_in_data(value: &Value) -> Option<Vec<Value>> {
    value.get("data")?.as_array().cloned()
}

fn order_id_top_level(value: &Value) -> Option<String> {
    first_string(value, ORDER_ID_FIELDS)
}

fn order_id_in_data(value: &Value) -> Option<String> {
    first_string(value.get("data")?, ORDER_ID_FIELDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_funds_shapes() {
        for payload in [
            json!({"available": 100}),
            json!({"data": {"cash": 100}}),
            json!({"limits": {"netCash": 100}}),
            json!({"availableCash": "100.0"}),
            json!(100),
        ] {
            assert_eq!(first_match(&payload, FUNDS_STRATEGIES), Some(100.0), "{}", payload);
        }
        assert_eq!(first_match(&json!({"unrelated": 1}), FUNDS_STRATEGIES), None);
    }

    #[test]
    fn test_funds_prefers_top_level_over_nested() {
        let payload = json!({"cash": 5, "data": {"cash": 7}});
        assert_eq!(first_match(&payload, FUNDS_STRATEGIES), Some(5.0));
    }

    #[test]
    fn test_funds_field_order_within_a_level() {
        let payload = json!({"limit": 1, "netCash": 2, "available": 3});
        assert_eq!(first_match(&payload, FUNDS_STRATEGIES), Some(3.0));
    }

    #[test]
    fn test_unparseable_field_falls_through() {
        let payload = json!({"available": "n/a", "data": {"netAvailable": 42.5}});
        assert_eq!(first_match(&payload, FUNDS_STRATEGIES), Some(42.5));
    }

    #[test]
    fn test_profit_shapes() {
        assert_eq!(first_match(&json!({"dayProfit": 7}), PROFIT_STRATEGIES), Some(7.0));
        assert_eq!(first_match(&json!({"data": {"mtm": "12.5"}}), PROFIT_STRATEGIES), Some(12.5));
        assert_eq!(first_match(&json!({"limits": {"realizedPnl": -3.25}}), PROFIT_STRATEGIES), Some(-3.25));
        assert_eq!(first_match(&json!({"pnl": 1, "data": {"pnl": 2}}), PROFIT_STRATEGIES), Some(1.0));
        assert_eq!(first_match(&json!({"x": 1}), PROFIT_STRATEGIES), None);
    }

    #[test]
    fn test_list_shapes() {
        let rows = first_match(&json!([{"a": 1}, {"a": 2}]), LIST_STRATEGIES).unwrap();
        assert_eq!(rows.len(), 2);
        let rows = first_match(&json!({"data": [{"a": 1}]}), LIST_STRATEGIES).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(first_match(&json!({"data": {"a": 1}}), LIST_STRATEGIES).is_none());
        assert!(first_match(&json!("nope"), LIST_STRATEGIES).is_none());
    }

    #[test]
    fn test_order_id_shapes() {
        assert_eq!(first_match(&json!({"orderId": "A1"}), ORDER_ID_STRATEGIES).as_deref(), Some("A1"));
        assert_eq!(first_match(&json!({"nOrdNo": 231101}), ORDER_ID_STRATEGIES).as_deref(), Some("231101"));
        assert_eq!(first_match(&json!({"data": {"id": "X"}}), ORDER_ID_STRATEGIES).as_deref(), Some("X"));
        assert_eq!(first_match(&json!({"order_id": ""}), ORDER_ID_STRATEGIES), None);
    }
}
