use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::transform::Transform;

// --- Mapping documents ---

/// Versioned, declarative description of the graph writes for one event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventMapping {
    pub event_type: String,
    pub version: String,
    /// Path whose truthiness gates the whole mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub node_writes: Vec<NodeWriteSpec>,
    #[serde(default)]
    pub relationship_writes: Vec<RelationshipWriteSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeWriteSpec {
    pub label: String,
    pub merge_key: Vec<MergeKeySpec>,
    #[serde(default)]
    pub properties: Vec<PropertyMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One component of a node's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeKeySpec {
    pub property: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMapping {
    pub property: String,
    pub source: ValueSource,
    #[serde(default)]
    pub required: bool,
}

/// Where a value comes from: a bare path, or a path with transform/default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ValueSource {
    Path(String),
    Extractor(ValueExtractor),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValueExtractor {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ValueSource {
    pub fn path(&self) -> &str {
        match self {
            ValueSource::Path(p) => p,
            ValueSource::Extractor(e) => &e.path,
        }
    }
}

impl From<&str> for ValueSource {
    fn from(path: &str) -> Self {
        ValueSource::Path(path.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipWriteSpec {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub from: EndpointSpec,
    pub to: EndpointSpec,
    #[serde(default)]
    pub properties: Vec<PropertyMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// MERGE both endpoints instead of MATCHing them.
    #[serde(default)]
    pub merge_endpoints: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    pub label: String,
    pub key_property: String,
    pub key_path: String,
    /// Set on creation when `mergeEndpoints` is on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyMapping>,
}

// --- Engine output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "rel")]
    Relationship,
}

/// A generated parameterized statement, ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOperation {
    pub kind: OperationKind,
    pub cypher: String,
    pub params: Map<String, Value>,
    /// Node label, or relationship type for relationship operations.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl GraphOperation {
    pub fn is_node(&self) -> bool {
        self.kind == OperationKind::Node
    }
}

/// Outcome of evaluating one mapping against one event.
#[derive(Debug, Clone)]
pub struct MappingResult {
    pub success: bool,
    pub operations: Vec<GraphOperation>,
    pub errors: Vec<MappingError>,
    pub warnings: Vec<String>,
    pub event_type: String,
    pub mapping_version: String,
}

impl MappingResult {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}
