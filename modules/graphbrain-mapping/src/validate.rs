//! Pre-deploy checks for mapping documents.

use std::collections::HashSet;

use schemars::schema::RootSchema;

use crate::query::{escape_label, escape_property_name};
use crate::types::{EndpointSpec, EventMapping, PropertyMapping};

/// JSON schema of the mapping document format, for authoring tools.
pub fn mapping_json_schema() -> RootSchema {
    schemars::schema_for!(EventMapping)
}

/// Structural problems in a mapping, as `"<location>: <message>"` strings.
/// An empty list means the mapping is well formed.
pub fn validate_mapping(mapping: &EventMapping) -> Vec<String> {
    let mut issues = Vec::new();

    if mapping.event_type.trim().is_empty() {
        issues.push("eventType: must not be empty".to_string());
    }
    if mapping.version.trim().is_empty() {
        issues.push("version: must not be empty".to_string());
    }
    if mapping.node_writes.is_empty() && mapping.relationship_writes.is_empty() {
        issues.push("mapping: declares no node or relationship writes".to_string());
    }

    for (i, node) in mapping.node_writes.iter().enumerate() {
        let at = format!("nodeWrites[{i}]");
        if let Err(e) = escape_label(&node.label) {
            issues.push(format!("{at}.label: {e}"));
        }
        if node.merge_key.is_empty() {
            issues.push(format!("{at}.mergeKey: must have at least one component"));
        }
        let mut seen = HashSet::new();
        for (k, key) in node.merge_key.iter().enumerate() {
            if let Err(e) = escape_property_name(&key.property) {
                issues.push(format!("{at}.mergeKey[{k}].property: {e}"));
            }
            if key.path.trim().is_empty() {
                issues.push(format!("{at}.mergeKey[{k}].path: must not be empty"));
            }
            if !seen.insert(key.property.as_str()) {
                issues.push(format!(
                    "{at}.mergeKey[{k}].property: duplicate '{}'",
                    key.property
                ));
            }
        }
        check_properties(&mut issues, &format!("{at}.properties"), &node.properties);
    }

    for (i, rel) in mapping.relationship_writes.iter().enumerate() {
        let at = format!("relationshipWrites[{i}]");
        if let Err(e) = escape_label(&rel.rel_type) {
            issues.push(format!("{at}.type: {e}"));
        }
        check_endpoint(&mut issues, &format!("{at}.from"), &rel.from);
        check_endpoint(&mut issues, &format!("{at}.to"), &rel.to);
        check_properties(&mut issues, &format!("{at}.properties"), &rel.properties);
        if !rel.merge_endpoints
            && (!rel.from.properties.is_empty() || !rel.to.properties.is_empty())
        {
            issues.push(format!(
                "{at}: endpoint properties are ignored unless mergeEndpoints is set"
            ));
        }
    }

    issues
}

fn check_endpoint(issues: &mut Vec<String>, at: &str, endpoint: &EndpointSpec) {
    if let Err(e) = escape_label(&endpoint.label) {
        issues.push(format!("{at}.label: {e}"));
    }
    if let Err(e) = escape_property_name(&endpoint.key_property) {
        issues.push(format!("{at}.keyProperty: {e}"));
    }
    if endpoint.key_path.trim().is_empty() {
        issues.push(format!("{at}.keyPath: must not be empty"));
    }
    check_properties(issues, &format!("{at}.properties"), &endpoint.properties);
}

fn check_properties(issues: &mut Vec<String>, at: &str, properties: &[PropertyMapping]) {
    for (i, prop) in properties.iter().enumerate() {
        if let Err(e) = escape_property_name(&prop.property) {
            issues.push(format!("{at}[{i}].property: {e}"));
        }
        if prop.source.path().trim().is_empty() {
            issues.push(format!("{at}[{i}].source: path must not be empty"));
        }
    }
}
