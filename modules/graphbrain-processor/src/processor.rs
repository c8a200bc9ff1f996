//! EventProcessor: registry gate → mapping → graph execution → status.
//!
//! Every terminal outcome is a [`ProcessingResult`]. Nothing escapes
//! [`EventProcessor::process_event`]: errors and panics raised anywhere below
//! it are caught at the boundary and reported through `mark_failed`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use graphbrain_common::{BrainError, Config, QueuedEvent};
use graphbrain_graph::{GraphClient, GraphExecutor};
use graphbrain_mapping::{deduplicate_node_operations, map_event_to_graph_ops, EventMapping};
use graphbrain_registry::{ProcessingRequirements, Registry};

use crate::mapping_store::MappingStore;
use crate::status::{ProcessingStatus, StatusWriter};

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Apply one event's operations all-or-nothing.
    pub use_transactions: bool,
    /// Keep going to later stages after a graph-stage error.
    pub continue_on_error: bool,
    pub mappings_dir: PathBuf,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            use_transactions: true,
            continue_on_error: true,
            mappings_dir: PathBuf::from("config/mappings"),
        }
    }
}

impl ProcessorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            use_transactions: config.use_transactions,
            continue_on_error: config.continue_on_error,
            mappings_dir: config.mappings_dir.clone(),
        }
    }
}

/// Outcome of processing one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub event_id: String,
    pub event_type: String,
    pub success: bool,
    /// Brain processing is not enabled for this event type.
    pub skipped: bool,
    pub status: ProcessingStatus,
    pub graph_operations_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl ProcessingResult {
    fn new(event_id: &str, event_type: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            success: false,
            skipped: false,
            status: ProcessingStatus::default(),
            graph_operations_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Aggregate of a sequential batch run. Results are in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub results: Vec<ProcessingResult>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Outcome of [`EventProcessor::preload_mappings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    /// `(event_type, error)` pairs.
    pub failed: Vec<(String, String)>,
}

pub struct EventProcessor<G, W> {
    registry: Arc<Registry>,
    mappings: MappingStore,
    graph: G,
    status: W,
    options: ProcessorOptions,
}

impl<W: StatusWriter> EventProcessor<GraphClient, W> {
    /// Connect to Neo4j and load the registry named by `config`.
    pub async fn from_config(config: &Config, status: W) -> Result<Self> {
        let registry = Registry::load(&config.registry_path).await?;
        let graph = GraphClient::from_config(config).await?;
        Ok(Self::new(
            Arc::new(registry),
            graph,
            status,
            ProcessorOptions::from_config(config),
        ))
    }
}

impl<G: GraphExecutor, W: StatusWriter> EventProcessor<G, W> {
    pub fn new(registry: Arc<Registry>, graph: G, status: W, options: ProcessorOptions) -> Self {
        Self {
            mappings: MappingStore::new(options.mappings_dir.clone()),
            registry,
            graph,
            status,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Validate a loosely typed queued event, then process it.
    pub async fn process_raw(&self, raw: &Value) -> ProcessingResult {
        match QueuedEvent::from_value(raw) {
            Ok(event) => self.process_event(&event).await,
            Err(e) => {
                let field = |name: &str| raw.get(name).and_then(Value::as_str).unwrap_or_default();
                let retry_count = raw
                    .get("retryCount")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok());
                self.reject(field("eventId"), field("eventType"), retry_count, e.into())
                    .await
            }
        }
    }

    pub async fn process_event(&self, event: &QueuedEvent) -> ProcessingResult {
        let started = Instant::now();

        if let Err(e) = event.validate() {
            let mut result = self
                .reject(&event.event_id, &event.event_type, event.retry_count, e.into())
                .await;
            result.duration_ms = elapsed_ms(started);
            return result;
        }

        let outcome = AssertUnwindSafe(self.run(event)).catch_unwind().await;
        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(event_id = event.event_id.as_str(), error = %e, "Event processing failed");
                self.boundary_failure(event, format!("Processing error: {e:#}"))
                    .await
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(event_id = event.event_id.as_str(), panic = message.as_str(), "Event processing panicked");
                self.boundary_failure(event, format!("Processing panicked: {message}"))
                    .await
            }
        };

        result.duration_ms = elapsed_ms(started);
        info!(
            event_id = event.event_id.as_str(),
            event_type = event.event_type.as_str(),
            success = result.success,
            skipped = result.skipped,
            done = result.status.done,
            operations = result.graph_operations_count,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Event processed"
        );
        result
    }

    /// Process events one at a time, in order. A failed event never stops the batch.
    pub async fn process_batch(&self, events: &[QueuedEvent]) -> BatchResult {
        let started = Instant::now();
        let mut results = Vec::with_capacity(events.len());
        let (mut succeeded, mut failed, mut skipped) = (0usize, 0usize, 0usize);

        for event in events {
            let result = self.process_event(event).await;
            if result.skipped {
                skipped += 1;
            } else if result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            results.push(result);
        }

        let duration_ms = elapsed_ms(started);
        info!(total = events.len(), succeeded, failed, skipped, duration_ms, "Batch processed");
        BatchResult {
            results,
            total: events.len(),
            succeeded,
            failed,
            skipped,
            duration_ms,
        }
    }

    /// Load the mapping of every enabled, graph-required event type.
    pub async fn preload_mappings(&self) -> PreloadReport {
        let mut report = PreloadReport::default();
        for event_type in self.registry.event_types_by_priority() {
            let requirements = self.registry.processing_requirements(&event_type);
            if !requirements.graph {
                continue;
            }
            match self.mappings.get(&event_type, &requirements).await {
                Ok(_) => report.loaded.push(event_type),
                Err(e) => {
                    warn!(event_type = event_type.as_str(), error = %e, "Mapping preload failed");
                    report.failed.push((event_type, e.to_string()));
                }
            }
        }
        info!(loaded = report.loaded.len(), failed = report.failed.len(), "Mappings preloaded");
        report
    }

    pub fn clear_mapping_cache(&self) {
        self.mappings.clear();
    }

    /// Register a mapping without touching the filesystem.
    pub fn insert_mapping(&self, mapping: EventMapping) {
        self.mappings.insert(mapping);
    }

    pub fn cached_mapping_count(&self) -> usize {
        self.mappings.len()
    }

    async fn run(&self, event: &QueuedEvent) -> Result<ProcessingResult> {
        let requirements = self.registry.processing_requirements(&event.event_type);
        let mut result = ProcessingResult::new(&event.event_id, &event.event_type);

        if !requirements.enabled {
            let reason = format!(
                "Brain processing not enabled for event type {}",
                event.event_type
            );
            self.status.mark_skipped(&event.event_id, &reason).await?;
            result.success = true;
            result.skipped = true;
            result.status.done = true;
            result.warnings.push(reason);
            return Ok(result);
        }

        if requirements.graph {
            self.graph_stage(event, &requirements, &mut result).await;
            if !result.errors.is_empty() && !self.options.continue_on_error {
                return self.finish(event, &requirements, result).await;
            }
        }

        // Vector and LLM stages are not built; a type that needs them never reaches done.
        if requirements.vector {
            result.warnings.push(format!(
                "Vector processing required for {} but not implemented",
                event.event_type
            ));
        }
        if requirements.llm_enrichment {
            result.warnings.push(format!(
                "LLM enrichment required for {} but not implemented",
                event.event_type
            ));
        }

        self.finish(event, &requirements, result).await
    }

    async fn graph_stage(
        &self,
        event: &QueuedEvent,
        requirements: &ProcessingRequirements,
        result: &mut ProcessingResult,
    ) {
        let mapping = match self.mappings.get(&event.event_type, requirements).await {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(event_type = event.event_type.as_str(), error = %e, "No usable mapping");
                result.errors.push(e.to_string());
                return;
            }
        };

        let mapped = map_event_to_graph_ops(&event.mappable_view(), &mapping);
        result.warnings.extend(mapped.warnings.iter().cloned());

        if !mapped.success {
            warn!(
                event_id = event.event_id.as_str(),
                mapping_version = mapped.mapping_version.as_str(),
                errors = mapped.errors.len(),
                "Mapping failed, nothing executed"
            );
            result.errors.extend(mapped.error_messages());
            return;
        }
        // Errors that only dropped a single write do not fail the event.
        result.warnings.extend(mapped.error_messages());

        let operations = deduplicate_node_operations(mapped.operations);
        result.graph_operations_count = operations.len();
        if operations.is_empty() {
            result.status.graph_upserted = true;
            return;
        }

        debug!(
            event_id = event.event_id.as_str(),
            operations = operations.len(),
            transactional = self.options.use_transactions,
            "Executing graph operations"
        );
        let execution = if self.options.use_transactions {
            self.graph.execute_operations_in_transaction(&operations).await
        } else {
            self.graph.execute_operations(&operations).await
        };

        match execution {
            Ok(execution) if execution.success => result.status.graph_upserted = true,
            Ok(execution) => {
                error!(
                    event_id = event.event_id.as_str(),
                    applied = execution.success_count,
                    errors = execution.errors.len(),
                    "Graph execution failed"
                );
                result.errors.extend(execution.errors);
            }
            Err(e) => {
                error!(event_id = event.event_id.as_str(), error = %e, "Graph execution failed");
                result.errors.push(format!("Graph execution error: {e:#}"));
            }
        }
    }

    async fn finish(
        &self,
        event: &QueuedEvent,
        requirements: &ProcessingRequirements,
        mut result: ProcessingResult,
    ) -> Result<ProcessingResult> {
        let status = &mut result.status;
        status.done = (!requirements.graph || status.graph_upserted)
            && (!requirements.vector || status.vector_upserted)
            && (!requirements.llm_enrichment || status.llm_enriched);
        result.success = result.errors.is_empty();

        if result.success {
            self.status
                .mark_processed(&event.event_id, &result.status)
                .await?;
        } else {
            self.status
                .mark_failed(&event.event_id, &result.errors, event.retry_count)
                .await?;
        }
        Ok(result)
    }

    /// Failed result for an event that never reached the registry gate.
    async fn reject(
        &self,
        event_id: &str,
        event_type: &str,
        retry_count: Option<u32>,
        error: BrainError,
    ) -> ProcessingResult {
        let mut result = ProcessingResult::new(event_id, event_type);
        result.errors.push(error.to_string());
        warn!(event_id, error = %error, "Rejected invalid event");

        // Without an id there is nothing to mark.
        if !event_id.is_empty() {
            self.report_failure(event_id, &result.errors, retry_count)
                .await;
        }
        result
    }

    async fn boundary_failure(&self, event: &QueuedEvent, message: String) -> ProcessingResult {
        let mut result = ProcessingResult::new(&event.event_id, &event.event_type);
        result.errors.push(message);
        self.report_failure(&event.event_id, &result.errors, event.retry_count)
            .await;
        result
    }

    /// `mark_failed` that only logs when the writer itself fails or panics.
    async fn report_failure(&self, event_id: &str, errors: &[String], retry_count: Option<u32>) {
        let marked = AssertUnwindSafe(self.status.mark_failed(event_id, errors, retry_count))
            .catch_unwind()
            .await;
        match marked {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(event_id, error = %e, "Failed to mark event failed"),
            Err(panic) => error!(
                event_id,
                panic = panic_message(panic.as_ref()).as_str(),
                "Status writer panicked while marking event failed"
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
