use thiserror::Error;

use crate::query::QueryError;

/// Resolution problems collected while evaluating a mapping.
///
/// Each one blocks only the write it belongs to; evaluation of the remaining
/// writes continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Node {label}: missing merge key values for [{}]", missing.join(", "))]
    MissingMergeKey { label: String, missing: Vec<String> },

    #[error("Required property '{property}' is missing for {target}")]
    RequiredPropertyMissing { target: String, property: String },

    #[error("Relationship {rel_type}: missing {endpoint} endpoint key {label}.{key_property}")]
    MissingEndpointKey {
        rel_type: String,
        endpoint: &'static str,
        label: String,
        key_property: String,
    },

    #[error("{target}: {source}")]
    Query {
        target: String,
        #[source]
        source: QueryError,
    },
}

impl MappingError {
    /// Whether this error marks the whole mapping as failed.
    pub fn fails_mapping(&self) -> bool {
        matches!(
            self,
            MappingError::MissingMergeKey { .. } | MappingError::RequiredPropertyMissing { .. }
        )
    }
}
