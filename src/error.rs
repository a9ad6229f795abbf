//! Error types for the generator core

use thiserror::Error;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Generator errors
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("dependency cycle detected at '{0}'")]
    CycleDetected(String),

    #[error("invalid schema document '{id}': {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("failed to parse '{document}' at {path}: {reason}")]
    Parse {
        document: String,
        path: String,
        reason: String,
    },

    #[error("failed to generate module for '{document}': {reason}")]
    Generate { document: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}
