//! Error handling for the linker NER service
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling.

use thiserror::Error;

use crate::models::ModelKind;

/// Main error type for the NER service
#[derive(Error, Debug)]
pub enum NerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown model arch: {0}")]
    UnknownArch(String),

    #[error("No {kind} model configured for language '{lang}'")]
    ModelNotFound { kind: ModelKind, lang: String },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}
