//! Lenient numeric decoding
//!
//! The authority is a JavaScript service, so amounts may arrive as floats,
//! numeric strings, `null`, or (after a bad division upstream) as values that
//! serialise to `null`/`"NaN"`/`"Infinity"`. None of those may reach displayed
//! state, so every numeric field goes through this module:
//!
//! - amounts inside an outcome or payout decode to `0` when invalid
//! - optional amounts (balances) decode to `None` when invalid
//! - a list with any invalid entry is treated as missing as a whole

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Convert a float to a whole sat amount. Non-finite and negative values are rejected.
pub fn finite_amount(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// Convert a finite, non-negative float weight. Anything else is rejected.
pub fn finite_weight(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Read a sat amount out of an arbitrary JSON value
pub fn amount_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => Some(v),
            None => n.as_f64().and_then(finite_amount),
        },
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite_amount),
        _ => None,
    }
}

/// Read a weight out of an arbitrary JSON value
pub fn weight_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite_weight),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite_weight),
        _ => None,
    }
}

/// Read a list of amounts; `None` when the value is not an array or any entry is invalid
pub fn amounts_from_value(value: &Value) -> Option<Vec<u64>> {
    value.as_array()?.iter().map(amount_from_value).collect()
}

/// Read a list of weights; `None` when the value is not an array or any entry is invalid
pub fn weights_from_value(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(weight_from_value).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERDE ADAPTERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `deserialize_with` adapter: invalid amounts become `0`
pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(amount_from_value(&value).unwrap_or(0))
}

/// `deserialize_with` adapter: invalid amounts are ignored
pub fn optional_amount<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(amount_from_value(&value))
}

/// `deserialize_with` adapter: an invalid list becomes empty
pub fn amount_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let amounts = amounts_from_value(&value);
    if amounts.is_none() && !value.is_null() {
        log::warn!("[Protocol] Discarding invalid amount list: {}", value);
    }
    Ok(amounts.unwrap_or_default())
}

/// `deserialize_with` adapter: an invalid weight list is dropped
pub fn weight_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<f64>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let weights = weights_from_value(&value);
    if weights.is_none() && !value.is_null() {
        log::warn!("[Protocol] Discarding invalid weight list: {}", value);
    }
    Ok(weights)
}

/// `deserialize_with` adapter for `{ "<bet>": [amounts] }` tables
pub fn amount_table<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<u64, Vec<u64>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(table_from_value(&value, amounts_from_value))
}

/// `deserialize_with` adapter for `{ "<bet>": [weights] }` tables
pub fn weight_table<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<u64, Vec<f64>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(table_from_value(&value, weights_from_value))
}

/// `deserialize_with` adapter: anything that is not `true` is `false`
pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

fn table_from_value<T>(value: &Value, row: impl Fn(&Value) -> Option<Vec<T>>) -> BTreeMap<u64, Vec<T>> {
    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };

    object
        .iter()
        .filter_map(|(key, entries)| {
            let bet = key.trim().parse::<f64>().ok().and_then(finite_amount)?;
            match row(entries) {
                Some(parsed) => Some((bet, parsed)),
                None => {
                    log::warn!("[Protocol] Dropping invalid table row for bet {}", key);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_from_value() {
        assert_eq!(amount_from_value(&json!(50)), Some(50));
        assert_eq!(amount_from_value(&json!(50.0)), Some(50));
        assert_eq!(amount_from_value(&json!("120")), Some(120));
        assert_eq!(amount_from_value(&json!(-5)), None);
        assert_eq!(amount_from_value(&json!("NaN")), None);
        assert_eq!(amount_from_value(&json!("Infinity")), None);
        assert_eq!(amount_from_value(&Value::Null), None);
        assert_eq!(amount_from_value(&json!({"a": 1})), None);
    }

    #[test]
    fn test_list_with_invalid_entry_is_rejected() {
        assert_eq!(amounts_from_value(&json!([0, 20, 50])), Some(vec![0, 20, 50]));
        assert_eq!(amounts_from_value(&json!([0, "oops", 50])), None);
        assert_eq!(weights_from_value(&json!([1, 2.5])), Some(vec![1.0, 2.5]));
        assert_eq!(weights_from_value(&json!([1, -2])), None);
        assert_eq!(weights_from_value(&json!("1,2")), None);
    }

    #[test]
    fn test_table_from_value() {
        let table = table_from_value(
            &json!({ "20": [0, 20, 50], "100": [0, "x"], "abc": [1] }),
            amounts_from_value,
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&20), Some(&vec![0, 20, 50]));
    }
}
