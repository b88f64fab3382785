//! Parameter Codec: type-safe accessors over a dynamically-typed parameter
//! map (`serde_json::Value`), with overflow guards.
//!
//! JSON numbers decode to `f64`; the `int` accessor must reject NaN,
//! infinities, and out-of-range values by falling back to the default
//! rather than silently truncating — this guard is mandatory (§9).

use serde_json::Value;

/// The observed JSON "kind" of a value, for error messages.
fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Require a string parameter, failing with a descriptive message naming
/// the missing key or its observed kind.
pub fn require_string(params: &Value, key: &str) -> Result<String, String> {
    match params.get(key) {
        None | Some(Value::Null) => Err(format!("missing required parameter {key}")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "parameter {key} must be a string, got {}",
            kind_name(other)
        )),
    }
}

/// Optional string parameter; missing or wrong-kind yields `default`.
pub fn string_optional(params: &Value, key: &str, default: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

/// Optional integer parameter accepting both integer and floating JSON
/// numbers. NaN, infinities, and values outside `i64` range fall back to
/// `default` rather than panicking or truncating silently.
pub fn int(params: &Value, key: &str, default: i64) -> i64 {
    match params.get(key).and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n >= i64::MIN as f64 && n <= i64::MAX as f64 => n as i64,
        _ => default,
    }
}

/// Optional boolean parameter; missing or wrong-kind yields `default`. No
/// string-to-bool coercion — `"true"` is not a bool.
pub fn bool_opt(params: &Value, key: &str, default: bool) -> bool {
    match params.get(key) {
        Some(Value::Bool(b)) => *b,
        _ => default,
    }
}

/// Require a non-empty array of strings.
pub fn require_string_array(params: &Value, key: &str) -> Result<Vec<String>, String> {
    match params.get(key) {
        Some(Value::Array(arr)) if !arr.is_empty() => arr
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(format!(
                    "parameter {key} must be an array of strings, found {}",
                    kind_name(other)
                )),
            })
            .collect(),
        Some(Value::Array(_)) => Err(format!("parameter {key} must be a non-empty array")),
        None | Some(Value::Null) => Err(format!("missing required parameter {key}")),
        Some(other) => Err(format!(
            "parameter {key} must be an array, got {}",
            kind_name(other)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_string_reports_missing_and_wrong_kind() {
        let p = json!({"a": 1});
        assert!(require_string(&p, "b").unwrap_err().contains("missing required parameter b"));
        assert!(require_string(&p, "a").unwrap_err().contains("must be a string, got number"));
    }

    #[test]
    fn int_rejects_nan_and_out_of_range() {
        let p = json!({"n": f64::NAN, "big": 1e300, "ok": 5});
        assert_eq!(int(&p, "n", 7), 7);
        assert_eq!(int(&p, "big", 7), 7);
        assert_eq!(int(&p, "ok", 7), 5);
        assert_eq!(int(&p, "missing", 7), 7);
    }

    #[test]
    fn bool_opt_has_no_string_coercion() {
        let p = json!({"flag": "true"});
        assert!(!bool_opt(&p, "flag", false));
        assert!(bool_opt(&p, "flag", true));
    }

    #[test]
    fn require_string_array_rejects_empty() {
        let p = json!({"a": []});
        assert!(require_string_array(&p, "a").is_err());
    }
}
