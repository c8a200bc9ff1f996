//! Dotted/indexed path resolution over arbitrary nested JSON.
//!
//! `None` plays the role of "undefined": the path does not lead anywhere.
//! `Some(Value::Null)` means the path exists and holds an explicit null.

use serde_json::Value;

use crate::types::ValueSource;

/// Resolve `a.b[2].c` against `value`. Never panics; any dead end yields `None`.
pub fn resolve_key_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        let (name, index) = split_index(segment);
        if !name.is_empty() || index.is_none() {
            current = current.as_object()?.get(name)?;
        }
        if let Some(index) = index {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// `attendees[1]` → (`attendees`, Some(1)). Anything not shaped like
/// `name[n]` is treated as a plain key.
fn split_index(segment: &str) -> (&str, Option<usize>) {
    let Some(stripped) = segment.strip_suffix(']') else {
        return (segment, None);
    };
    let Some(open) = stripped.rfind('[') else {
        return (segment, None);
    };
    match stripped[open + 1..].parse::<usize>() {
        Ok(index) => (&stripped[..open], Some(index)),
        Err(_) => (segment, None),
    }
}

/// Resolve a source, substitute its default when unresolved, then apply its
/// transform to whatever non-null value remains.
pub fn extract_value(event: &Value, source: &ValueSource) -> Option<Value> {
    match source {
        ValueSource::Path(path) => resolve_key_path(event, path).cloned(),
        ValueSource::Extractor(extractor) => {
            let value = resolve_key_path(event, &extractor.path)
                .cloned()
                .or_else(|| extractor.default.clone())?;
            match extractor.transform {
                Some(transform) if !value.is_null() => Some(transform.apply(&value)),
                _ => Some(value),
            }
        }
    }
}

/// Truthiness of the value at `path`; unresolved paths are false.
pub fn evaluate_condition(event: &Value, path: &str) -> bool {
    resolve_key_path(event, path).is_some_and(is_truthy)
}

/// Loose truthiness: null, false, 0, NaN and "" are false; everything else,
/// including empty arrays and objects, is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use crate::types::ValueExtractor;
    use serde_json::json;

    #[test]
    fn resolves_indexed_segment() {
        let event = json!({"payload": {"attendees": [{}, {"email": "a@b.com"}]}});
        assert_eq!(
            resolve_key_path(&event, "payload.attendees[1].email"),
            Some(&json!("a@b.com"))
        );
    }

    #[test]
    fn null_intermediate_is_undefined() {
        let event = json!({"payload": {"organizer": null}});
        assert_eq!(resolve_key_path(&event, "payload.organizer.email"), None);
    }

    #[test]
    fn explicit_null_leaf_is_resolved() {
        let event = json!({"payload": {"organizer": null}});
        assert_eq!(resolve_key_path(&event, "payload.organizer"), Some(&Value::Null));
    }

    #[test]
    fn out_of_range_index_is_undefined() {
        let event = json!({"items": [1, 2]});
        assert_eq!(resolve_key_path(&event, "items[2]"), None);
    }

    #[test]
    fn index_on_non_array_is_undefined() {
        let event = json!({"items": {"0": "x"}});
        assert_eq!(resolve_key_path(&event, "items[0]"), None);
    }

    #[test]
    fn key_access_on_scalar_is_undefined() {
        let event = json!({"title": "Sync"});
        assert_eq!(resolve_key_path(&event, "title.length"), None);
    }

    #[test]
    fn malformed_index_is_a_plain_key() {
        let event = json!({"odd[x]": 5});
        assert_eq!(resolve_key_path(&event, "odd[x]"), Some(&json!(5)));
    }

    #[test]
    fn default_substitutes_for_undefined_then_transforms() {
        let event = json!({});
        let source = ValueSource::Extractor(ValueExtractor {
            path: "payload.status".into(),
            transform: Some(Transform::ToUpperCase),
            default: Some(json!("pending")),
        });
        assert_eq!(extract_value(&event, &source), Some(json!("PENDING")));
    }

    #[test]
    fn explicit_null_does_not_take_default() {
        let event = json!({"status": null});
        let source = ValueSource::Extractor(ValueExtractor {
            path: "status".into(),
            transform: Some(Transform::ToNumber),
            default: Some(json!(1)),
        });
        assert_eq!(extract_value(&event, &source), Some(Value::Null));
    }

    #[test]
    fn conditions_follow_truthiness() {
        let event = json!({"a": 0, "b": "x", "c": [], "d": "", "e": false});
        assert!(!evaluate_condition(&event, "a"));
        assert!(evaluate_condition(&event, "b"));
        assert!(evaluate_condition(&event, "c"));
        assert!(!evaluate_condition(&event, "d"));
        assert!(!evaluate_condition(&event, "e"));
        assert!(!evaluate_condition(&event, "missing"));
    }
}
