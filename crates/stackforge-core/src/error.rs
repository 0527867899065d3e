//! Synthesis errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid logical id: {0}")]
    InvalidLogicalId(String),

    #[error("invalid {kind} name '{name}': {rule}")]
    InvalidResourceName {
        kind: &'static str,
        name: String,
        rule: &'static str,
    },

    #[error("duplicate logical id in stack '{stack}': {id}")]
    DuplicateLogicalId { stack: String, id: String },

    #[error("duplicate stack: {0}")]
    DuplicateStack(String),

    #[error("unknown stack: {0}")]
    UnknownStack(String),

    #[error("image asset context not found: {0}")]
    AssetNotFound(String),

    #[error("invalid property for {resource}: {message}")]
    InvalidProperty { resource: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SynthResult<T> = std::result::Result<T, SynthError>;
