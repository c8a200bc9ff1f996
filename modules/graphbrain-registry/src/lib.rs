//! Event-type registry: which event types the brain processes, and how.
//!
//! Loaded once from a versioned JSON document and swappable at runtime via
//! [`Registry::reload`]. Unknown event types are never processed.

pub mod registry;
pub mod types;
pub mod validate;

pub use registry::{Registry, RegistrySnapshot};
pub use types::{
    BrainConfig, BrainConfigOverrides, MappingRef, ProcessingRequirements, RegistryEntry,
    RegistrySummary, ResolvedEntry, DEFAULT_BRAIN_CONFIG,
};
pub use validate::{validate_registry, validate_registry_entry};
