use serde_json::{Map, Value};
use std::io;

/// Series fields written as CSV rows, in priority order.
const SERIES_KEYS: [&str; 7] = [
    "years", "periods", "snapshots", "rows", "annual", "samples", "markets",
];

/// Write output as CSV to stdout.
///
/// The first time series found in the result is written one row per
/// element; results without a series fall back to field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => match find_series(map) {
            Some(series) => write_array_csv(&mut wtr, series),
            None => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn find_series(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    SERIES_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))
        .or_else(|| {
            map.values()
                .filter_map(Value::as_object)
                .find_map(|nested| SERIES_KEYS.iter().find_map(|k| nested.get(*k)?.as_array()))
        })
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_yearly_series() {
        let result = json!({ "summary": { "total": "1" }, "years": [{ "year": 2024 }] });
        let series = find_series(result.as_object().unwrap()).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_scalar_result_has_no_series() {
        let result = json!({ "npv": "100", "rate": "0.1" });
        assert!(find_series(result.as_object().unwrap()).is_none());
    }
}
