//! Declarative event → graph mapping.
//!
//! A versioned [`EventMapping`] describes, for one event type, which nodes and
//! relationships an event produces. [`map_event_to_graph_ops`] evaluates it
//! against one event and returns parameterized MERGE statements. Evaluation is
//! pure: the same event and mapping always yield byte-identical operations.

pub mod engine;
pub mod error;
pub mod merge_key;
pub mod path;
pub mod query;
pub mod transform;
pub mod types;
pub mod validate;

pub use engine::{
    collect_operations, deduplicate_node_operations, map_event_to_graph_ops, CollectedOperations,
};
pub use error::MappingError;
pub use merge_key::{build_merge_key, generate_merge_key_string};
pub use path::{evaluate_condition, extract_value, is_truthy, resolve_key_path};
pub use query::{
    combine_queries, escape_label, escape_property_name, generate_node_merge,
    generate_relationship_merge, generate_relationship_merge_with_nodes, param_name,
    GeneratedQuery, NodeRef, QueryError,
};
pub use transform::Transform;
pub use types::*;
pub use validate::{mapping_json_schema, validate_mapping};
