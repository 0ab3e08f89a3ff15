use arena_finance_core::types::Currency;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::currency::format_currency;

/// Fields reported by `--output minimal`, in priority order.
const PRIORITY_KEYS: [&str; 10] = [
    "enterprise_value",
    "npv",
    "irr",
    "payback",
    "payment",
    "total",
    "score",
    "final_revenue",
    "ncg",
    "net_income",
];

const MONEY_KEYS: [&str; 6] = [
    "enterprise_value",
    "npv",
    "payment",
    "total",
    "final_revenue",
    "net_income",
];

/// Print just the key answer value from the output.
///
/// Looks for a priority field in the result, then one level down in its
/// nested objects, then falls back to the first field.
pub fn print_minimal(value: &Value, currency: Currency) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = find_priority(map) {
            println!("{}", format_minimal(key, val, currency));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(key, val, currency));
            return;
        }
    }

    println!("{}", format_minimal("", result_obj, currency));
}

fn find_priority(map: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    priority_field(map).or_else(|| {
        map.values()
            .filter_map(Value::as_object)
            .find_map(priority_field)
    })
}

fn priority_field(map: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    PRIORITY_KEYS
        .iter()
        .find_map(|k| map.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))
}

fn format_minimal(key: &str, value: &Value, currency: Currency) -> String {
    match value {
        Value::String(s) if MONEY_KEYS.contains(&key) => s
            .parse::<Decimal>()
            .map(|d| format_currency(d, currency))
            .unwrap_or_else(|_| s.clone()),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finds_nested_priority_key() {
        let result = json!({ "financing": { "debt_amount": "100" }, "indicators": { "npv": "1500000" } });
        let map = result.as_object().unwrap();
        let (key, val) = find_priority(map).unwrap();
        assert_eq!(key, "npv");
        assert_eq!(format_minimal(key, val, Currency::BRL), "R$ 1.50M");
    }

    #[test]
    fn test_rates_are_not_formatted_as_money() {
        assert_eq!(format_minimal("irr", &json!("0.18"), Currency::EUR), "0.18");
    }
}
