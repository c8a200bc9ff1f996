//! Named value transforms applied by mapping extractors.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::path::is_truthy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Transform {
    ToLowerCase,
    ToUpperCase,
    ToString,
    /// Numeric coercion; null when the input is not numeric.
    ToNumber,
    ToBoolean,
    /// Epoch milliseconds; numbers pass through, unparseable input is null.
    ToTimestamp,
}

impl Transform {
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Transform::ToLowerCase => Value::String(loose_string(value).to_lowercase()),
            Transform::ToUpperCase => Value::String(loose_string(value).to_uppercase()),
            Transform::ToString => Value::String(loose_string(value)),
            Transform::ToNumber => to_number(value),
            Transform::ToBoolean => Value::Bool(to_boolean(value)),
            Transform::ToTimestamp => to_timestamp(value),
        }
    }
}

/// String form of any value. Arrays join their elements with commas.
fn loose_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => loose_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

fn to_number(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => return Value::Number(n.clone()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    };
    match parsed.filter(|f| f.is_finite()) {
        Some(f) => number_value(f),
        None => Value::Null,
    }
}

fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        other => is_truthy(other),
    }
}

fn to_timestamp(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => parse_epoch_millis(s).map(Value::from).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Parse a date string to epoch milliseconds. Strings without an offset are
/// read as UTC.
pub fn parse_epoch_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn case_transforms() {
        assert_eq!(Transform::ToLowerCase.apply(&json!("MiXeD")), json!("mixed"));
        assert_eq!(Transform::ToUpperCase.apply(&json!("MiXeD")), json!("MIXED"));
    }

    #[test]
    fn to_string_formats_numbers_without_trailing_zero() {
        assert_eq!(Transform::ToString.apply(&json!(42)), json!("42"));
        assert_eq!(Transform::ToString.apply(&json!(2.0)), json!("2"));
        assert_eq!(Transform::ToString.apply(&json!(1.5)), json!("1.5"));
        assert_eq!(Transform::ToString.apply(&json!(true)), json!("true"));
        assert_eq!(Transform::ToString.apply(&json!(["a", null, 1])), json!("a,,1"));
    }

    #[test]
    fn to_number_coerces_or_nulls() {
        assert_eq!(Transform::ToNumber.apply(&json!("42")), json!(42));
        assert_eq!(Transform::ToNumber.apply(&json!(" 3.5 ")), json!(3.5));
        assert_eq!(Transform::ToNumber.apply(&json!("")), json!(0));
        assert_eq!(Transform::ToNumber.apply(&json!(true)), json!(1));
        assert_eq!(Transform::ToNumber.apply(&json!("abc")), Value::Null);
        assert_eq!(Transform::ToNumber.apply(&json!("NaN")), Value::Null);
        assert_eq!(Transform::ToNumber.apply(&json!({"a": 1})), Value::Null);
    }

    #[test]
    fn to_boolean_rules() {
        assert_eq!(Transform::ToBoolean.apply(&json!(false)), json!(false));
        assert_eq!(Transform::ToBoolean.apply(&json!("TRUE")), json!(true));
        assert_eq!(Transform::ToBoolean.apply(&json!("1")), json!(true));
        assert_eq!(Transform::ToBoolean.apply(&json!("yes")), json!(false));
        assert_eq!(Transform::ToBoolean.apply(&json!("false")), json!(false));
        assert_eq!(Transform::ToBoolean.apply(&json!(0)), json!(false));
        assert_eq!(Transform::ToBoolean.apply(&json!(7)), json!(true));
        assert_eq!(Transform::ToBoolean.apply(&json!([])), json!(true));
    }

    #[test]
    fn to_timestamp_parses_dates() {
        assert_eq!(
            Transform::ToTimestamp.apply(&json!("2023-11-14T10:00:00Z")),
            json!(1_699_956_000_000i64)
        );
        assert_eq!(
            Transform::ToTimestamp.apply(&json!("2023-11-14T11:00:00+01:00")),
            json!(1_699_956_000_000i64)
        );
        assert_eq!(Transform::ToTimestamp.apply(&json!("2023-11-14")), json!(1_699_920_000_000i64));
        assert_eq!(Transform::ToTimestamp.apply(&json!(1_700_000_000_000i64)), json!(1_700_000_000_000i64));
        assert_eq!(Transform::ToTimestamp.apply(&json!("not a date")), Value::Null);
        assert_eq!(Transform::ToTimestamp.apply(&json!(true)), Value::Null);
    }

    #[test]
    fn transform_names_are_camel_case() {
        let t: Transform = serde_json::from_value(json!("toTimestamp")).unwrap();
        assert_eq!(t, Transform::ToTimestamp);
        assert!(serde_json::from_value::<Transform>(json!("toSlug")).is_err());
    }
}
