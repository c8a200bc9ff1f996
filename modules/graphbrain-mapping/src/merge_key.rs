use serde_json::{Map, Value};

use crate::path::resolve_key_path;
use crate::types::MergeKeySpec;

/// Resolve every merge-key component. Components resolving to null or
/// nothing are left out, so callers must compare the result's length with
/// `specs.len()` before trusting it as an identity.
pub fn build_merge_key(event: &Value, specs: &[MergeKeySpec]) -> Map<String, Value> {
    specs
        .iter()
        .filter_map(|spec| {
            resolve_key_path(event, &spec.path)
                .filter(|v| !v.is_null())
                .map(|v| (spec.property.clone(), v.clone()))
        })
        .collect()
}

/// Canonical identity string for a node. Property order does not matter.
pub fn generate_merge_key_string(label: &str, values: &Map<String, Value>) -> String {
    let mut names: Vec<&String> = values.keys().collect();
    names.sort();
    let parts: Vec<String> = names
        .into_iter()
        .map(|name| format!("{name}={}", values[name.as_str()]))
        .collect();
    format!("{label}:{}", parts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(property: &str, path: &str) -> MergeKeySpec {
        MergeKeySpec {
            property: property.into(),
            path: path.into(),
        }
    }

    #[test]
    fn partial_key_omits_unresolved_components() {
        let event = json!({"payload": {"id": "x", "tenant": null}});
        let key = build_merge_key(
            &event,
            &[spec("id", "payload.id"), spec("tenant", "payload.tenant"), spec("region", "payload.region")],
        );
        assert_eq!(key.len(), 1);
        assert_eq!(key["id"], json!("x"));
    }

    #[test]
    fn key_string_ignores_property_order() {
        let mut a = Map::new();
        a.insert("b".into(), json!(2));
        a.insert("a".into(), json!("one"));
        let mut b = Map::new();
        b.insert("a".into(), json!("one"));
        b.insert("b".into(), json!(2));
        assert_eq!(generate_merge_key_string("Node", &a), generate_merge_key_string("Node", &b));
        assert_eq!(generate_merge_key_string("Node", &a), r#"Node:a="one"|b=2"#);
    }

    #[test]
    fn key_string_distinguishes_types() {
        let mut num = Map::new();
        num.insert("id".into(), json!(1));
        let mut text = Map::new();
        text.insert("id".into(), json!("1"));
        assert_ne!(generate_merge_key_string("N", &num), generate_merge_key_string("N", &text));
    }
}
