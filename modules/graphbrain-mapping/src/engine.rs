//! Mapping engine: one mapping + one event → graph operations.
//!
//! Evaluation never stops early. Every node and relationship write is
//! evaluated so a single pass reports every problem with the event.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::MappingError;
use crate::merge_key::{build_merge_key, generate_merge_key_string};
use crate::path::{evaluate_condition, extract_value, resolve_key_path};
use crate::query::{
    generate_node_merge, generate_relationship_merge, generate_relationship_merge_with_nodes,
    NodeRef,
};
use crate::types::{
    EndpointSpec, EventMapping, GraphOperation, MappingResult, NodeWriteSpec, OperationKind,
    PropertyMapping, RelationshipWriteSpec,
};

/// A node write that failed in this evaluation, with whatever part of its
/// key did resolve.
struct FailedNode {
    label: String,
    partial_key: Map<String, Value>,
}

#[derive(Default)]
struct Evaluation {
    operations: Vec<GraphOperation>,
    errors: Vec<MappingError>,
    warnings: Vec<String>,
    failed_nodes: Vec<FailedNode>,
}

/// Evaluate `mapping` against `event`.
pub fn map_event_to_graph_ops(event: &Value, mapping: &EventMapping) -> MappingResult {
    if let Some(condition) = &mapping.condition {
        if !evaluate_condition(event, condition) {
            return MappingResult {
                success: true,
                operations: Vec::new(),
                errors: Vec::new(),
                warnings: vec![format!(
                    "Mapping condition '{condition}' not met for {}, skipping",
                    mapping.event_type
                )],
                event_type: mapping.event_type.clone(),
                mapping_version: mapping.version.clone(),
            };
        }
    }

    let mut eval = Evaluation::default();

    for spec in &mapping.node_writes {
        eval.node_write(event, spec);
    }
    for spec in &mapping.relationship_writes {
        eval.relationship_write(event, spec);
    }

    let success = !eval.errors.iter().any(MappingError::fails_mapping);
    if eval.operations.is_empty() && eval.errors.is_empty() {
        eval.warnings.push(format!(
            "no operations generated for {} (mapping {})",
            mapping.event_type, mapping.version
        ));
    }

    debug!(
        event_type = mapping.event_type.as_str(),
        version = mapping.version.as_str(),
        operations = eval.operations.len(),
        errors = eval.errors.len(),
        "Mapping evaluated"
    );

    MappingResult {
        success,
        operations: eval.operations,
        errors: eval.errors,
        warnings: eval.warnings,
        event_type: mapping.event_type.clone(),
        mapping_version: mapping.version.clone(),
    }
}

impl Evaluation {
    fn node_write(&mut self, event: &Value, spec: &NodeWriteSpec) {
        if !condition_holds(event, spec.condition.as_deref()) {
            return;
        }

        let key = build_merge_key(event, &spec.merge_key);
        let mut failed = false;

        if key.len() != spec.merge_key.len() {
            let missing = spec
                .merge_key
                .iter()
                .filter(|k| !key.contains_key(&k.property))
                .map(|k| k.path.clone())
                .collect();
            self.errors.push(MappingError::MissingMergeKey {
                label: spec.label.clone(),
                missing,
            });
            failed = true;
        }

        let target = format!("node {}", spec.label);
        let properties = self.properties(event, &spec.properties, &target);
        failed |= properties.is_none();

        let Some(properties) = properties.filter(|_| !failed) else {
            self.failed_nodes.push(FailedNode {
                label: spec.label.clone(),
                partial_key: key,
            });
            return;
        };

        match generate_node_merge(&spec.label, &key, &properties) {
            Ok(query) => self.operations.push(GraphOperation {
                kind: OperationKind::Node,
                cypher: query.cypher,
                params: query.params,
                label: spec.label.clone(),
                alias: spec.alias.clone(),
            }),
            Err(source) => self.errors.push(MappingError::Query { target, source }),
        }
    }

    fn relationship_write(&mut self, event: &Value, spec: &RelationshipWriteSpec) {
        if !condition_holds(event, spec.condition.as_deref()) {
            return;
        }

        let from_value = self.endpoint_value(event, spec, &spec.from, "from");
        let to_value = self.endpoint_value(event, spec, &spec.to, "to");
        let target = format!("relationship {}", spec.rel_type);
        let properties = self.properties(event, &spec.properties, &target);

        let (Some(from_value), Some(to_value)) = (from_value, to_value) else {
            return;
        };

        for (endpoint, value) in [(&spec.from, &from_value), (&spec.to, &to_value)] {
            if self.references_failed_node(endpoint, value) {
                self.warnings.push(format!(
                    "Relationship {} suppressed: endpoint {} failed validation",
                    spec.rel_type, endpoint.label
                ));
                return;
            }
        }

        let Some(properties) = properties else {
            return;
        };

        let from_key = single_key(&spec.from.key_property, from_value);
        let to_key = single_key(&spec.to.key_property, to_value);
        let from = NodeRef {
            label: &spec.from.label,
            key: &from_key,
        };
        let to = NodeRef {
            label: &spec.to.label,
            key: &to_key,
        };

        let generated = if spec.merge_endpoints {
            let from_target = format!("endpoint {}", spec.from.label);
            let to_target = format!("endpoint {}", spec.to.label);
            let from_create = self.properties(event, &spec.from.properties, &from_target);
            let to_create = self.properties(event, &spec.to.properties, &to_target);
            let (Some(from_create), Some(to_create)) = (from_create, to_create) else {
                return;
            };
            generate_relationship_merge_with_nodes(
                &spec.rel_type,
                from,
                &from_create,
                to,
                &to_create,
                &properties,
            )
        } else {
            generate_relationship_merge(&spec.rel_type, from, to, &properties)
        };

        match generated {
            Ok(query) => self.operations.push(GraphOperation {
                kind: OperationKind::Relationship,
                cypher: query.cypher,
                params: query.params,
                label: spec.rel_type.clone(),
                alias: None,
            }),
            Err(source) => self.errors.push(MappingError::Query { target, source }),
        }
    }

    /// Extract a property set. `None` when a required property is missing;
    /// the errors are recorded either way.
    fn properties(
        &mut self,
        event: &Value,
        mappings: &[PropertyMapping],
        target: &str,
    ) -> Option<Map<String, Value>> {
        let mut out = Map::new();
        let mut complete = true;
        for mapping in mappings {
            match extract_value(event, &mapping.source) {
                Some(value) if !value.is_null() => {
                    out.insert(mapping.property.clone(), value);
                }
                _ if mapping.required => {
                    self.errors.push(MappingError::RequiredPropertyMissing {
                        target: target.to_string(),
                        property: mapping.property.clone(),
                    });
                    complete = false;
                }
                _ => {}
            }
        }
        complete.then_some(out)
    }

    fn endpoint_value(
        &mut self,
        event: &Value,
        spec: &RelationshipWriteSpec,
        endpoint: &EndpointSpec,
        side: &'static str,
    ) -> Option<Value> {
        let value = resolve_key_path(event, &endpoint.key_path).filter(|v| !v.is_null());
        if value.is_none() {
            self.errors.push(MappingError::MissingEndpointKey {
                rel_type: spec.rel_type.clone(),
                endpoint: side,
                label: endpoint.label.clone(),
                key_property: endpoint.key_property.clone(),
            });
        }
        value.cloned()
    }

    /// A failed node is this endpoint only if its key resolved to the
    /// endpoint's key value. A node whose key never resolved has no identity
    /// any endpoint could match.
    fn references_failed_node(&self, endpoint: &EndpointSpec, value: &Value) -> bool {
        self.failed_nodes.iter().any(|failed| {
            failed.label == endpoint.label
                && failed.partial_key.get(&endpoint.key_property) == Some(value)
        })
    }
}

fn condition_holds(event: &Value, condition: Option<&str>) -> bool {
    condition.map_or(true, |path| evaluate_condition(event, path))
}

fn single_key(property: &str, value: Value) -> Map<String, Value> {
    let mut key = Map::new();
    key.insert(property.to_string(), value);
    key
}

/// Collapse node operations that write the same logical node.
///
/// Nodes are keyed by label plus their sorted merge-key parameters; a later
/// write replaces an earlier one in place. Relationship operations are never
/// merged and follow all node operations in their original order.
pub fn deduplicate_node_operations(operations: Vec<GraphOperation>) -> Vec<GraphOperation> {
    let mut nodes: Vec<GraphOperation> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut relationships = Vec::new();

    for op in operations {
        match op.kind {
            OperationKind::Relationship => relationships.push(op),
            OperationKind::Node => {
                let signature = node_signature(&op);
                match index.get(&signature) {
                    Some(&i) => nodes[i] = op,
                    None => {
                        index.insert(signature, nodes.len());
                        nodes.push(op);
                    }
                }
            }
        }
    }

    nodes.extend(relationships);
    nodes
}

fn node_signature(op: &GraphOperation) -> String {
    let key: Map<String, Value> = op
        .params
        .iter()
        .filter(|(name, _)| name.starts_with("key_"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    generate_merge_key_string(&op.label, &key)
}

/// Operations of every successful result, ready for one batched execution.
#[derive(Debug, Clone, Default)]
pub struct CollectedOperations {
    pub operations: Vec<GraphOperation>,
    pub success_count: usize,
    pub failure_count: usize,
}

pub fn collect_operations(results: &[MappingResult]) -> CollectedOperations {
    let mut collected = CollectedOperations::default();
    for result in results {
        if result.success {
            collected.success_count += 1;
            collected.operations.extend(result.operations.iter().cloned());
        } else {
            collected.failure_count += 1;
        }
    }
    collected
}
