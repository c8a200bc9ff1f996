//! Registry merge semantics, queries, validation, and reload.

use graphbrain_registry::{
    validate_registry, validate_registry_entry, Registry, RegistrySnapshot, DEFAULT_BRAIN_CONFIG,
};
use serde_json::{json, Value};

fn document() -> Value {
    json!({
        "version": "2024.06.1",
        "lastUpdated": "2024-06-01T00:00:00Z",
        "defaults": { "batchSize": 25, "maxRetries": 5 },
        "entries": {
            "calendar.event_created": {
                "eventType": "calendar.event_created",
                "brain": { "enabled": true, "graphRequired": true, "priority": 10 },
                "mapping": { "path": "calendar.event_created.json", "version": "1.0.0" }
            },
            "email.received": {
                "brain": { "enabled": true, "graphRequired": true, "vectorRequired": true, "priority": 5, "batchSize": 50 },
                "mapping": { "path": "email.received.json" }
            },
            "contact.updated": {
                "brain": { "enabled": true, "graphRequired": true, "priority": 10 },
                "mapping": { "path": "contact.updated.json" }
            },
            "task.completed": {
                "brain": { "enabled": false, "graphRequired": true, "vectorRequired": true, "llmEnrichmentRequired": true },
                "mapping": { "path": "task.completed.json" }
            }
        }
    })
}

// =========================================================================
// Effective config
// =========================================================================

#[test]
fn effective_config_layers_default_then_document_then_entry() {
    let registry = Registry::from_document(&document());

    let email = registry.brain_config("email.received");
    assert_eq!(email.batch_size, 50); // entry
    assert_eq!(email.max_retries, 5); // document defaults
    assert_eq!(email.timeout_ms, DEFAULT_BRAIN_CONFIG.timeout_ms); // built-in

    let calendar = registry.brain_config("calendar.event_created");
    assert_eq!(calendar.batch_size, 25);
    assert_eq!(calendar.priority, 10);
}

#[test]
fn unknown_event_type_is_disabled() {
    let registry = Registry::from_document(&document());
    assert_eq!(registry.brain_config("nope"), DEFAULT_BRAIN_CONFIG);
    assert!(!registry.is_brain_enabled("nope"));
    assert_eq!(registry.mapping_path("nope"), None);
}

#[test]
fn unknown_event_type_ignores_enabling_defaults() {
    let mut doc = document();
    doc["defaults"]["enabled"] = json!(true);
    let registry = Registry::from_document(&doc);
    assert!(!registry.is_brain_enabled("nope"));
}

// =========================================================================
// Queries
// =========================================================================

#[test]
fn disabled_entry_requires_nothing() {
    let registry = Registry::from_document(&document());
    assert!(!registry.is_brain_enabled("task.completed"));
    assert!(!registry.requires_graph_processing("task.completed"));
    assert!(!registry.requires_vector_processing("task.completed"));
    assert!(!registry.requires_llm_enrichment("task.completed"));

    let reqs = registry.processing_requirements("task.completed");
    assert!(!reqs.enabled && !reqs.graph && !reqs.vector && !reqs.llm_enrichment);
}

#[test]
fn requirements_bundle_flags_and_mapping() {
    let registry = Registry::from_document(&document());
    let reqs = registry.processing_requirements("calendar.event_created");

    assert!(reqs.enabled);
    assert!(reqs.graph);
    assert!(!reqs.vector);
    assert_eq!(reqs.priority, 10);
    assert_eq!(reqs.mapping_path.as_deref(), Some("calendar.event_created.json"));
    assert_eq!(reqs.mapping_version.as_deref(), Some("1.0.0"));
    assert!(registry.requires_vector_processing("email.received"));
}

#[test]
fn priority_order_is_descending_and_stable() {
    let registry = Registry::from_document(&document());
    assert_eq!(
        registry.event_types_by_priority(),
        vec![
            "calendar.event_created".to_string(),
            "contact.updated".to_string(),
            "email.received".to_string(),
        ]
    );
}

#[test]
fn priority_ties_keep_document_order() {
    let registry = Registry::from_document(&json!({
        "version": "1",
        "entries": {
            "zeta.first": { "brain": { "enabled": true, "priority": 5 } },
            "mid.top": { "brain": { "enabled": true, "priority": 9 } },
            "alpha.second": { "brain": { "enabled": true, "priority": 5 } },
            "beta.off": { "brain": { "enabled": false, "priority": 5 } }
        }
    }));

    assert_eq!(
        registry.event_types_by_priority(),
        ["mid.top", "zeta.first", "alpha.second"]
    );
    assert_eq!(
        registry.event_types(),
        ["zeta.first", "mid.top", "alpha.second", "beta.off"]
    );
}

#[test]
fn summary_counts() {
    let summary = Registry::from_document(&document()).summary();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.enabled, 3);
    assert_eq!(summary.graph_required, 3);
}

#[test]
fn malformed_entry_is_skipped_not_fatal() {
    let mut doc = document();
    doc["entries"]["broken.event"] = json!({ "brain": { "enabled": "yes" } });
    let snapshot = RegistrySnapshot::from_document(&doc);

    assert!(snapshot.entry("broken.event").is_none());
    assert!(snapshot.is_brain_enabled("calendar.event_created"));
    assert_eq!(snapshot.version, "2024.06.1");
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn valid_document_has_no_issues() {
    assert!(validate_registry(&document()).is_empty());
}

#[test]
fn document_level_problems() {
    let issues = validate_registry(&json!({ "defaults": {} }));
    assert!(issues.contains(&"registry: version is required".to_string()));
    assert!(issues.contains(&"registry: entries map is required".to_string()));
}

#[test]
fn graph_required_without_mapping_path() {
    let issues = validate_registry_entry(
        "note.created",
        &json!({ "brain": { "enabled": true, "graphRequired": true } }),
    );
    assert_eq!(
        issues,
        vec!["note.created: mapping.path is required when graphRequired is true".to_string()]
    );
}

#[test]
fn non_boolean_flags_are_reported() {
    let issues = validate_registry_entry(
        "note.created",
        &json!({ "brain": { "enabled": "true", "graphRequired": 1 } }),
    );
    assert!(issues.contains(&"note.created: brain.enabled must be a boolean".to_string()));
    assert!(issues.contains(&"note.created: brain.graphRequired must be a boolean".to_string()));
}

#[test]
fn graph_required_from_defaults_still_needs_a_path() {
    let doc = json!({
        "version": "1",
        "defaults": { "enabled": true, "graphRequired": true },
        "entries": { "note.created": { "brain": {} } }
    });
    let issues = validate_registry(&doc);
    assert_eq!(
        issues,
        vec!["note.created: mapping.path is required when graphRequired is true".to_string()]
    );
}

// =========================================================================
// Reload
// =========================================================================

#[tokio::test]
async fn reload_picks_up_changes_on_disk() {
    let dir = std::env::temp_dir().join(format!("graphbrain-registry-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("event-registry.json");

    tokio::fs::write(&path, document().to_string()).await.unwrap();
    let registry = Registry::load(&path).await.unwrap();
    assert!(!registry.is_brain_enabled("task.completed"));

    let mut updated = document();
    updated["version"] = json!("2024.06.2");
    updated["entries"]["task.completed"]["brain"]["enabled"] = json!(true);
    tokio::fs::write(&path, updated.to_string()).await.unwrap();

    registry.reload().await.unwrap();
    assert_eq!(registry.version(), "2024.06.2");
    assert!(registry.is_brain_enabled("task.completed"));

    // A broken file keeps the last good snapshot.
    tokio::fs::write(&path, "{ not json").await.unwrap();
    assert!(registry.reload().await.is_err());
    assert_eq!(registry.version(), "2024.06.2");

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn reload_without_source_is_an_error() {
    let registry = Registry::from_document(&document());
    assert!(registry.reload().await.is_err());
}
