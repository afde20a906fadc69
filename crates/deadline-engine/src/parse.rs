//! Fail-soft interpretation of oracle answers.
//!
//! A malformed answer for one sentence must never abort the rest of the
//! conversation, so every stage funnels its parsing through
//! [`parse_or_default`] and supplies an explicit fallback.

use serde_json::{Map, Value};
use tracing::debug;

/// Run `parse` over `raw`; on `None` log and return `default()`.
pub fn parse_or_default<T>(
    stage: &'static str,
    raw: &str,
    parse: impl FnOnce(&str) -> Option<T>,
    default: impl FnOnce() -> T,
) -> T {
    match parse(raw) {
        Some(value) => value,
        None => {
            debug!(stage, raw, "unparseable oracle answer, using default");
            default()
        }
    }
}

/// Strip markdown code fences from a response string.
pub fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

/// Parse an answer as JSON, tolerating a surrounding code fence.
pub fn parse_json(raw: &str) -> Option<Value> {
    serde_json::from_str(strip_code_fences(raw)).ok()
}

/// Parse an answer that must be a JSON object.
pub fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    match parse_json(raw)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// The answer as an audit payload: parsed JSON when possible, else the text itself.
pub fn raw_payload(raw: &str) -> Value {
    parse_json(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

/// A non-blank string field, trimmed.
pub fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerce a JSON number or numeric string to a finite `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_used_when_parse_fails() {
        let v = parse_or_default("test", "nope", |s| s.parse::<i32>().ok(), || -1);
        assert_eq!(v, -1);
        let v = parse_or_default("test", "42", |s| s.parse::<i32>().ok(), || -1);
        assert_eq!(v, 42);
    }

    #[test]
    fn strip_json_code_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn object_parsing() {
        assert!(parse_json_object("{\"kind\": \"x\"}").is_some());
        assert!(parse_json_object("```json\n{\"kind\": \"x\"}\n```").is_some());
        assert!(parse_json_object("[1, 2]").is_none());
        assert!(parse_json_object("\"text\"").is_none());
        assert!(parse_json_object("kind: x").is_none());
    }

    #[test]
    fn raw_payload_keeps_text_when_not_json() {
        assert_eq!(raw_payload("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(raw_payload("I think so"), json!("I think so"));
    }

    #[test]
    fn string_field_rules() {
        let map = parse_json_object(r#"{"a": " x ", "b": "  ", "c": 3, "d": null}"#).unwrap();
        assert_eq!(string_field(&map, "a").as_deref(), Some("x"));
        assert_eq!(string_field(&map, "b"), None);
        assert_eq!(string_field(&map, "c"), None);
        assert_eq!(string_field(&map, "d"), None);
        assert_eq!(string_field(&map, "missing"), None);
    }

    #[test]
    fn f64_coercion() {
        assert_eq!(coerce_f64(&json!(0.75)), Some(0.75));
        assert_eq!(coerce_f64(&json!(1)), Some(1.0));
        assert_eq!(coerce_f64(&json!(" 0.4 ")), Some(0.4));
        assert_eq!(coerce_f64(&json!("high")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_f64(&Value::Null), None);
    }
}
