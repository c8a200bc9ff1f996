use serde::{Deserialize, Serialize};

/// Effective per-event-type processing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainConfig {
    pub enabled: bool,
    pub graph_required: bool,
    pub vector_required: bool,
    pub llm_enrichment_required: bool,
    pub priority: i64,
    pub batch_size: u32,
    /// Advisory; retries belong to the caller.
    pub max_retries: u32,
    /// Advisory; timeouts belong to the caller.
    pub timeout_ms: u64,
}

pub const DEFAULT_BRAIN_CONFIG: BrainConfig = BrainConfig {
    enabled: false,
    graph_required: false,
    vector_required: false,
    llm_enrichment_required: false,
    priority: 0,
    batch_size: 10,
    max_retries: 3,
    timeout_ms: 30_000,
};

impl Default for BrainConfig {
    fn default() -> Self {
        DEFAULT_BRAIN_CONFIG
    }
}

/// A partial [`BrainConfig`] as written in the document's `defaults` or an
/// entry's `brain` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrainConfigOverrides {
    pub enabled: Option<bool>,
    pub graph_required: Option<bool>,
    pub vector_required: Option<bool>,
    pub llm_enrichment_required: Option<bool>,
    pub priority: Option<i64>,
    pub batch_size: Option<u32>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl BrainConfigOverrides {
    /// Layer these overrides on top of `base`; set fields win.
    pub fn apply(&self, base: BrainConfig) -> BrainConfig {
        BrainConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            graph_required: self.graph_required.unwrap_or(base.graph_required),
            vector_required: self.vector_required.unwrap_or(base.vector_required),
            llm_enrichment_required: self
                .llm_enrichment_required
                .unwrap_or(base.llm_enrichment_required),
            priority: self.priority.unwrap_or(base.priority),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRef {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// An entry as written in the registry document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub brain: BrainConfigOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingRef>,
}

/// An entry with its effective configuration computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub event_type: String,
    pub brain: BrainConfig,
    pub mapping: Option<MappingRef>,
}

/// Everything the processor needs to decide what to do with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequirements {
    pub enabled: bool,
    pub graph: bool,
    pub vector: bool,
    pub llm_enrichment: bool,
    pub priority: i64,
    pub mapping_path: Option<String>,
    pub mapping_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySummary {
    pub total: usize,
    pub enabled: usize,
    pub graph_required: usize,
}
