//! Pre-deploy checks for registry documents.
//!
//! Loading never fails on these; they exist so CI can reject a document
//! before it ships.

use serde_json::{Map, Value};

const BOOLEAN_FLAGS: [&str; 4] = [
    "enabled",
    "graphRequired",
    "vectorRequired",
    "llmEnrichmentRequired",
];
const COUNT_FIELDS: [&str; 3] = ["batchSize", "maxRetries", "timeoutMs"];

/// Every problem in the document as `"<eventType>: <message>"`.
/// Document-level problems use `registry` as the prefix.
pub fn validate_registry(doc: &Value) -> Vec<String> {
    let mut issues = Vec::new();
    let Some(obj) = doc.as_object() else {
        issues.push("registry: document must be an object".to_string());
        return issues;
    };

    match obj.get("version") {
        Some(Value::String(v)) if !v.trim().is_empty() => {}
        _ => issues.push("registry: version is required".to_string()),
    }

    let defaults = match obj.get("defaults") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => {
            check_brain_fields(&mut issues, "registry", "defaults", map);
            Some(map)
        }
        Some(_) => {
            issues.push("registry: defaults must be an object".to_string());
            None
        }
    };

    match obj.get("entries") {
        Some(Value::Object(entries)) => {
            for (event_type, entry) in entries {
                issues.extend(entry_issues(event_type, entry, defaults));
            }
        }
        _ => issues.push("registry: entries map is required".to_string()),
    }

    issues
}

/// Problems in a single entry, without document defaults.
pub fn validate_registry_entry(event_type: &str, entry: &Value) -> Vec<String> {
    entry_issues(event_type, entry, None)
}

fn entry_issues(event_type: &str, entry: &Value, defaults: Option<&Map<String, Value>>) -> Vec<String> {
    let mut issues = Vec::new();
    let Some(obj) = entry.as_object() else {
        issues.push(format!("{event_type}: entry must be an object"));
        return issues;
    };

    if let Some(declared) = obj.get("eventType") {
        if declared.as_str() != Some(event_type) {
            issues.push(format!("{event_type}: eventType {declared} does not match its key"));
        }
    }

    let brain = match obj.get("brain") {
        Some(Value::Object(brain)) => {
            check_brain_fields(&mut issues, event_type, "brain", brain);
            Some(brain)
        }
        None => {
            issues.push(format!("{event_type}: brain config is required"));
            None
        }
        Some(_) => {
            issues.push(format!("{event_type}: brain must be an object"));
            None
        }
    };

    if let Some(brain) = brain {
        let defaulted = defaults.is_some_and(|d| d.contains_key("enabled"));
        if !brain.contains_key("enabled") && !defaulted {
            issues.push(format!("{event_type}: brain.enabled is required"));
        }
    }

    let graph_required = brain
        .and_then(|b| b.get("graphRequired"))
        .or_else(|| defaults.and_then(|d| d.get("graphRequired")))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mapping_path = obj
        .get("mapping")
        .and_then(|m| m.get("path"))
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty());

    match obj.get("mapping") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => issues.push(format!("{event_type}: mapping must be an object")),
    }

    if graph_required && mapping_path.is_none() {
        issues.push(format!(
            "{event_type}: mapping.path is required when graphRequired is true"
        ));
    }

    issues
}

fn check_brain_fields(issues: &mut Vec<String>, prefix: &str, block: &str, brain: &Map<String, Value>) {
    for flag in BOOLEAN_FLAGS {
        if let Some(v) = brain.get(flag) {
            if !v.is_boolean() {
                issues.push(format!("{prefix}: {block}.{flag} must be a boolean"));
            }
        }
    }
    if let Some(v) = brain.get("priority") {
        if !(v.is_i64() || v.is_u64()) {
            issues.push(format!("{prefix}: {block}.priority must be an integer"));
        }
    }
    for field in COUNT_FIELDS {
        if let Some(v) = brain.get(field) {
            if !v.is_u64() {
                issues.push(format!("{prefix}: {block}.{field} must be a non-negative integer"));
            }
        }
    }
}
