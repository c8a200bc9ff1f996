//! Lazily loaded, process-lifetime cache of event mappings.
//!
//! Entries live until [`MappingStore::clear`]; there is no time-based
//! eviction. Concurrent loads of the same type are harmless: the last write
//! wins and both read the same document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use graphbrain_common::BrainError;
use graphbrain_mapping::{validate_mapping, EventMapping};
use graphbrain_registry::ProcessingRequirements;

pub struct MappingStore {
    mappings_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<EventMapping>>>,
}

impl MappingStore {
    pub fn new(mappings_dir: impl Into<PathBuf>) -> Self {
        Self {
            mappings_dir: mappings_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached mapping for `event_type`, loading it on first use.
    pub async fn get(
        &self,
        event_type: &str,
        requirements: &ProcessingRequirements,
    ) -> Result<Arc<EventMapping>, BrainError> {
        if let Some(hit) = self.cached(event_type) {
            return Ok(hit);
        }

        let path = self.resolve_path(event_type, requirements.mapping_path.as_deref());
        let mapping = load_mapping(&path).await?;

        if mapping.event_type != event_type {
            return Err(BrainError::MappingLoad(format!(
                "{} declares event type {}, expected {event_type}",
                path.display(),
                mapping.event_type
            )));
        }
        if let Some(pinned) = &requirements.mapping_version {
            if &mapping.version != pinned {
                return Err(BrainError::MappingLoad(format!(
                    "{} is version {}, registry pins {pinned}",
                    path.display(),
                    mapping.version
                )));
            }
        }

        let issues = validate_mapping(&mapping);
        if !issues.is_empty() {
            warn!(event_type, issues = ?issues, "Mapping loaded with structural issues");
        }

        info!(event_type, version = mapping.version.as_str(), path = %path.display(), "Mapping loaded");
        Ok(self.insert(mapping))
    }

    /// Put a mapping in the cache directly, replacing any cached version.
    pub fn insert(&self, mapping: EventMapping) -> Arc<EventMapping> {
        let mapping = Arc::new(mapping);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mapping.event_type.clone(), mapping.clone());
        mapping
    }

    pub fn cached(&self, event_type: &str) -> Option<Arc<EventMapping>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
    }

    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registry path (relative to the mappings directory unless absolute),
    /// else `<mappings_dir>/<event_type>.json`.
    fn resolve_path(&self, event_type: &str, registry_path: Option<&str>) -> PathBuf {
        match registry_path {
            Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
            Some(path) => self.mappings_dir.join(path),
            None => self.mappings_dir.join(format!("{event_type}.json")),
        }
    }
}

async fn load_mapping(path: &Path) -> Result<EventMapping, BrainError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        BrainError::MappingLoad(format!("failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| BrainError::MappingLoad(format!("failed to parse {}: {e}", path.display())))
}
