use std::env;
use std::path::PathBuf;

use crate::error::BrainError;

const DEFAULT_REGISTRY_PATH: &str = "config/event-registry.json";
const DEFAULT_MAPPINGS_DIR: &str = "config/mappings";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Registry + mappings
    pub registry_path: PathBuf,
    pub mappings_dir: PathBuf,

    // Processing
    pub use_transactions: bool,
    pub continue_on_error: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, BrainError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BrainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BrainError::Config(format!("{key} environment variable is required")))
        };

        Ok(Self {
            neo4j_uri: required("NEO4J_URI")?,
            neo4j_user: required("NEO4J_USER")?,
            neo4j_password: required("NEO4J_PASSWORD")?,
            registry_path: lookup("BRAIN_REGISTRY_PATH")
                .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_string())
                .into(),
            mappings_dir: lookup("BRAIN_MAPPINGS_DIR")
                .unwrap_or_else(|| DEFAULT_MAPPINGS_DIR.to_string())
                .into(),
            use_transactions: bool_var("BRAIN_USE_TRANSACTIONS", lookup("BRAIN_USE_TRANSACTIONS"), true)?,
            continue_on_error: bool_var("BRAIN_CONTINUE_ON_ERROR", lookup("BRAIN_CONTINUE_ON_ERROR"), true)?,
        })
    }
}

fn bool_var(key: &str, raw: Option<String>, default: bool) -> Result<bool, BrainError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(BrainError::Config(format!(
            "{key} must be true/false/1/0, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const NEO4J: [(&str, &str); 3] = [
        ("NEO4J_URI", "bolt://localhost:7687"),
        ("NEO4J_USER", "neo4j"),
        ("NEO4J_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = Config::from_lookup(lookup_from(&NEO4J)).unwrap();
        assert_eq!(config.registry_path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.mappings_dir, PathBuf::from(DEFAULT_MAPPINGS_DIR));
        assert!(config.use_transactions);
        assert!(config.continue_on_error);
    }

    #[test]
    fn missing_required_var_is_config_error() {
        let err = Config::from_lookup(lookup_from(&NEO4J[..2])).unwrap_err();
        assert!(err.to_string().contains("NEO4J_PASSWORD"));
    }

    #[test]
    fn boolean_flags_parse_case_insensitively() {
        let mut pairs = NEO4J.to_vec();
        pairs.push(("BRAIN_USE_TRANSACTIONS", "FALSE"));
        pairs.push(("BRAIN_CONTINUE_ON_ERROR", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(!config.use_transactions);
        assert!(!config.continue_on_error);
    }

    #[test]
    fn garbage_boolean_is_rejected() {
        let mut pairs = NEO4J.to_vec();
        pairs.push(("BRAIN_USE_TRANSACTIONS", "maybe"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
