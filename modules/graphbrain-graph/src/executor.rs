//! The contract the processor executes graph operations through.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use graphbrain_mapping::GraphOperation;

/// Aggregated outcome of executing a batch of operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub success_count: usize,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn empty() -> Self {
        Self {
            success: true,
            success_count: 0,
            errors: Vec::new(),
        }
    }
}

/// Executes generated operations against a graph store.
///
/// Implemented by [`crate::GraphClient`] (Neo4j) and by scripted fakes in tests.
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    /// Run each operation independently; failures are reported per operation
    /// and do not stop the rest.
    async fn execute_operations(&self, ops: &[GraphOperation]) -> Result<ExecutionResult>;

    /// Run all operations in one transaction: all applied, or none.
    async fn execute_operations_in_transaction(
        &self,
        ops: &[GraphOperation],
    ) -> Result<ExecutionResult>;
}

#[async_trait]
impl<G: GraphExecutor + ?Sized> GraphExecutor for Arc<G> {
    async fn execute_operations(&self, ops: &[GraphOperation]) -> Result<ExecutionResult> {
        (**self).execute_operations(ops).await
    }

    async fn execute_operations_in_transaction(
        &self,
        ops: &[GraphOperation],
    ) -> Result<ExecutionResult> {
        (**self).execute_operations_in_transaction(ops).await
    }
}
