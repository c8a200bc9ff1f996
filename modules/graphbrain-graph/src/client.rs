use anyhow::Result;
use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph};
use tracing::{debug, warn};

use graphbrain_common::Config;
use graphbrain_mapping::GraphOperation;

use crate::bolt::to_query;
use crate::executor::{ExecutionResult, GraphExecutor};

/// Thin wrapper around neo4rs::Graph providing connection setup and
/// execution of generated operations.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(10)
            .build()?;
        let graph = Graph::connect(config).await?;
        Ok(Self { graph })
    }

    pub async fn from_config(config: &Config) -> Result<Self, neo4rs::Error> {
        Self::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

fn describe(index: usize, op: &GraphOperation, error: &neo4rs::Error) -> String {
    format!("operation {index} ({}): {error}", op.label)
}

#[async_trait]
impl GraphExecutor for GraphClient {
    async fn execute_operations(&self, ops: &[GraphOperation]) -> Result<ExecutionResult> {
        let mut result = ExecutionResult::empty();

        for (i, op) in ops.iter().enumerate() {
            match self.graph.run(to_query(op)).await {
                Ok(()) => {
                    debug!(index = i, label = op.label.as_str(), "Operation applied");
                    result.success_count += 1;
                }
                Err(e) => {
                    warn!(index = i, label = op.label.as_str(), error = %e, "Operation failed");
                    result.errors.push(describe(i, op, &e));
                }
            }
        }

        result.success = result.errors.is_empty();
        Ok(result)
    }

    async fn execute_operations_in_transaction(
        &self,
        ops: &[GraphOperation],
    ) -> Result<ExecutionResult> {
        if ops.is_empty() {
            return Ok(ExecutionResult::empty());
        }

        let failed = |errors: Vec<String>| ExecutionResult {
            success: false,
            success_count: 0,
            errors,
        };

        let mut txn = match self.graph.start_txn().await {
            Ok(txn) => txn,
            Err(e) => return Ok(failed(vec![format!("failed to start transaction: {e}")])),
        };

        for (i, op) in ops.iter().enumerate() {
            if let Err(e) = txn.run(to_query(op)).await {
                warn!(index = i, label = op.label.as_str(), error = %e, "Operation failed, rolling back");
                let mut errors = vec![describe(i, op, &e)];
                if let Err(rollback) = txn.rollback().await {
                    errors.push(format!("rollback failed: {rollback}"));
                }
                return Ok(failed(errors));
            }
        }

        if let Err(e) = txn.commit().await {
            return Ok(failed(vec![format!("commit failed: {e}")]));
        }

        debug!(operations = ops.len(), "Transaction committed");
        Ok(ExecutionResult {
            success: true,
            success_count: ops.len(),
            errors: Vec::new(),
        })
    }
}
