use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{info, warn};

use graphbrain_common::BrainError;

use crate::types::{
    BrainConfig, BrainConfigOverrides, ProcessingRequirements, RegistryEntry, RegistrySummary,
    ResolvedEntry, DEFAULT_BRAIN_CONFIG,
};

/// Immutable view of one loaded registry document.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub version: String,
    pub last_updated: Option<String>,
    /// In document order.
    pub entries: Vec<ResolvedEntry>,
    by_type: HashMap<String, usize>,
}

impl RegistrySnapshot {
    /// Build a snapshot from a registry document.
    ///
    /// Lenient: a malformed `defaults` block or entry is logged and ignored so
    /// one bad entry cannot take down every other event type. Use
    /// [`crate::validate_registry`] to surface those problems before deploy.
    pub fn from_document(doc: &Value) -> Self {
        let version = doc
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let last_updated = doc
            .get("lastUpdated")
            .and_then(Value::as_str)
            .map(str::to_string);

        let defaults = match doc.get("defaults") {
            None | Some(Value::Null) => BrainConfigOverrides::default(),
            Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "Registry defaults are malformed, ignoring");
                BrainConfigOverrides::default()
            }),
        };
        let base = defaults.apply(DEFAULT_BRAIN_CONFIG);

        let mut entries = Vec::new();
        let mut by_type = HashMap::new();
        if let Some(raw_entries) = doc.get("entries").and_then(Value::as_object) {
            for (event_type, raw) in raw_entries {
                let entry: RegistryEntry = match serde_json::from_value(raw.clone()) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(event_type = event_type.as_str(), error = %e, "Skipping malformed registry entry");
                        continue;
                    }
                };
                by_type.insert(event_type.clone(), entries.len());
                entries.push(ResolvedEntry {
                    event_type: event_type.clone(),
                    brain: entry.brain.apply(base),
                    mapping: entry.mapping,
                });
            }
        }

        Self {
            version,
            last_updated,
            entries,
            by_type,
        }
    }

    pub fn entry(&self, event_type: &str) -> Option<&ResolvedEntry> {
        self.by_type.get(event_type).map(|&i| &self.entries[i])
    }

    /// Effective config; unregistered types get the disabled default.
    pub fn brain_config(&self, event_type: &str) -> BrainConfig {
        self.entry(event_type)
            .map(|e| e.brain)
            .unwrap_or(DEFAULT_BRAIN_CONFIG)
    }

    pub fn is_brain_enabled(&self, event_type: &str) -> bool {
        self.brain_config(event_type).enabled
    }

    pub fn requires_graph_processing(&self, event_type: &str) -> bool {
        let c = self.brain_config(event_type);
        c.enabled && c.graph_required
    }

    pub fn requires_vector_processing(&self, event_type: &str) -> bool {
        let c = self.brain_config(event_type);
        c.enabled && c.vector_required
    }

    pub fn requires_llm_enrichment(&self, event_type: &str) -> bool {
        let c = self.brain_config(event_type);
        c.enabled && c.llm_enrichment_required
    }

    pub fn mapping_path(&self, event_type: &str) -> Option<String> {
        self.entry(event_type)
            .and_then(|e| e.mapping.as_ref())
            .map(|m| m.path.clone())
            .filter(|p| !p.is_empty())
    }

    pub fn processing_requirements(&self, event_type: &str) -> ProcessingRequirements {
        let c = self.brain_config(event_type);
        ProcessingRequirements {
            enabled: c.enabled,
            graph: c.enabled && c.graph_required,
            vector: c.enabled && c.vector_required,
            llm_enrichment: c.enabled && c.llm_enrichment_required,
            priority: c.priority,
            mapping_path: self.mapping_path(event_type),
            mapping_version: self
                .entry(event_type)
                .and_then(|e| e.mapping.as_ref())
                .and_then(|m| m.version.clone()),
        }
    }

    /// Enabled event types, highest priority first. Ties stay in document order.
    pub fn event_types_by_priority(&self) -> Vec<String> {
        let mut enabled: Vec<&ResolvedEntry> =
            self.entries.iter().filter(|e| e.brain.enabled).collect();
        enabled.sort_by(|a, b| b.brain.priority.cmp(&a.brain.priority));
        enabled.into_iter().map(|e| e.event_type.clone()).collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            total: self.entries.len(),
            enabled: self.entries.iter().filter(|e| e.brain.enabled).count(),
            graph_required: self
                .entries
                .iter()
                .filter(|e| e.brain.enabled && e.brain.graph_required)
                .count(),
        }
    }
}

/// Shared, reloadable registry. Readers always see one complete snapshot.
pub struct Registry {
    snapshot: ArcSwap<RegistrySnapshot>,
    source: Option<PathBuf>,
}

impl Registry {
    pub fn from_document(doc: &Value) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::from_document(doc)),
            source: None,
        }
    }

    /// Load the registry document at `path`.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, BrainError> {
        let path = path.into();
        let snapshot = read_snapshot(&path).await?;
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            source: Some(path),
        })
    }

    /// Re-read the source document. On failure the current snapshot stays.
    pub async fn reload(&self) -> Result<(), BrainError> {
        let Some(path) = &self.source else {
            return Err(BrainError::Registry(
                "registry was not loaded from a file".to_string(),
            ));
        };
        let snapshot = read_snapshot(path).await?;
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    /// Replace the snapshot with one built from `doc`.
    pub fn replace(&self, doc: &Value) {
        self.snapshot
            .store(Arc::new(RegistrySnapshot::from_document(doc)));
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    pub fn version(&self) -> String {
        self.snapshot.load().version.clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.snapshot
            .load()
            .entries
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    pub fn brain_config(&self, event_type: &str) -> BrainConfig {
        self.snapshot.load().brain_config(event_type)
    }

    pub fn is_brain_enabled(&self, event_type: &str) -> bool {
        self.snapshot.load().is_brain_enabled(event_type)
    }

    pub fn requires_graph_processing(&self, event_type: &str) -> bool {
        self.snapshot.load().requires_graph_processing(event_type)
    }

    pub fn requires_vector_processing(&self, event_type: &str) -> bool {
        self.snapshot.load().requires_vector_processing(event_type)
    }

    pub fn requires_llm_enrichment(&self, event_type: &str) -> bool {
        self.snapshot.load().requires_llm_enrichment(event_type)
    }

    pub fn mapping_path(&self, event_type: &str) -> Option<String> {
        self.snapshot.load().mapping_path(event_type)
    }

    pub fn processing_requirements(&self, event_type: &str) -> ProcessingRequirements {
        self.snapshot.load().processing_requirements(event_type)
    }

    pub fn event_types_by_priority(&self) -> Vec<String> {
        self.snapshot.load().event_types_by_priority()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.snapshot.load().summary()
    }
}

async fn read_snapshot(path: &PathBuf) -> Result<RegistrySnapshot, BrainError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        BrainError::Registry(format!("failed to read {}: {e}", path.display()))
    })?;
    let doc: Value = serde_json::from_str(&raw)?;
    let snapshot = RegistrySnapshot::from_document(&doc);
    let summary = snapshot.summary();
    info!(
        path = %path.display(),
        version = snapshot.version.as_str(),
        total = summary.total,
        enabled = summary.enabled,
        graph_required = summary.graph_required,
        "Registry loaded"
    );
    Ok(snapshot)
}
