use thiserror::Error;

use crate::event::EventValidationError;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Mapping load error: {0}")]
    MappingLoad(String),

    #[error("Invalid event: {0}")]
    Validation(#[from] EventValidationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
