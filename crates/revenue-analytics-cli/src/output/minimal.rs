use serde_json::Value;

/// Headline field of each metric, in lookup order.
const HEADLINE_KEYS: [&str; 10] = [
    "this_month_count",
    "mrr_per_customer",
    "arr_breakdown",
    "gross_revenue_retention",
    "retention_rate",
    "at_risk",
    "completion_percentage",
    "time_to_onboard",
    "valid",
    "version",
];

/// Print just the headline value from the output.
///
/// Looks for a metric's headline field first, then falls back to the first
/// field of the result object. The customer map prints one line per customer.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            for key in &HEADLINE_KEYS {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
                return;
            }
            println!("{}", format_minimal(result));
        }
        Value::Array(rows) => {
            for row in rows {
                let id = row.get("organization_id").map(format_minimal);
                let state = row.get("state").map(format_minimal);
                match (id, state) {
                    (Some(id), Some(state)) => println!("{id} {state}"),
                    _ => println!("{}", format_minimal(row)),
                }
            }
        }
        _ => println!("{}", format_minimal(result)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
