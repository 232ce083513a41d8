//! Value comparison helpers shared by the engine.

use serde_json::Value;

/// Sentinel-aware equality: numbers compare by numeric value, everything
/// else by JSON equality. `"66"` never matches `66`.
pub fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

pub fn matches_any(value: &Value, codes: &[Value]) -> bool {
    codes.iter().any(|code| values_match(value, code))
}

/// Absent for resolution purposes: missing from the store or explicit null.
pub fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}
