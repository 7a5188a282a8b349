//! Timestamp normalization for filings records.
//!
//! The listing endpoint encodes dates as JavaScript constructor calls,
//! `"new Date(1262304000000)"`. [`normalize_record`] rewrites every such
//! string, at any depth, into an RFC 3339 UTC timestamp and leaves everything
//! else untouched.

use crate::models::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JS_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^new Date\((\d+)\)$").expect("static regex is valid")
});

/// Return a copy of `record` with every embedded JS date rewritten.
pub fn normalize_record(record: &Record) -> Record {
    record
        .iter()
        .map(|(k, v)| (k.clone(), normalize_value(v)))
        .collect()
}

/// Recursive worker behind [`normalize_record`].
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => match parse_js_date(s) {
            Some(dt) => Value::String(format_timestamp(&dt)),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Parse `new Date(<millis>)`. Out-of-range millis are treated as no match.
pub fn parse_js_date(s: &str) -> Option<DateTime<Utc>> {
    let caps = JS_DATE.captures(s)?;
    let millis: i64 = caps[1].parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// `1970-01-01T00:00:01+00:00`, with `.mmm` only when the millis are non-zero.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_normalize_mixed_record() {
        let input = record(json!({
            "a": "new Date(1000)",
            "b": "new Date(0)",
            "c": "not a date",
            "d": 42,
            "e": ["new Date(1000)"]
        }));
        let expected = record(json!({
            "a": "1970-01-01T00:00:01+00:00",
            "b": "1970-01-01T00:00:00+00:00",
            "c": "not a date",
            "d": 42,
            "e": ["1970-01-01T00:00:01+00:00"]
        }));
        assert_eq!(normalize_record(&input), expected);
    }

    #[test]
    fn test_normalize_nested_structures() {
        let input = record(json!({
            "case": {
                "filed": "new Date(1262304000000)",
                "events": [{"at": "new Date(1262304000500)"}, "new Date(abc)", null, true]
            }
        }));
        let out = normalize_record(&input);
        assert_eq!(out["case"]["filed"], json!("2010-01-01T00:00:00+00:00"));
        assert_eq!(out["case"]["events"][0]["at"], json!("2010-01-01T00:00:00.500+00:00"));
        assert_eq!(out["case"]["events"][1], json!("new Date(abc)"));
        assert_eq!(out["case"]["events"][2], Value::Null);
        assert_eq!(out["case"]["events"][3], json!(true));
    }

    #[test]
    fn test_normalize_rejects_lookalikes() {
        for s in [
            "new Date(-5)",
            " new Date(5)",
            "new Date(5) ",
            "new Date()",
            "Date(5)",
            "new Date(99999999999999999999999)",
        ] {
            assert_eq!(normalize_value(&json!(s)), json!(s), "{s} should pass through");
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = record(json!({
            "x": "new Date(1700000000123)",
            "y": ["new Date(0)", {"z": "plain"}],
            "n": 1.5
        }));
        let once = normalize_record(&input);
        let twice = normalize_record(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_preserves_key_order_and_input() {
        let input = record(json!({"z": 1, "a": "new Date(0)", "m": 2}));
        let out = normalize_record(&input);
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(input["a"], json!("new Date(0)"));
    }
}
