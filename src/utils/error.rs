//! Error Handling Module
//!
//! Defines the error taxonomy for the diagnosis pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for plant diagnosis operations
#[derive(Error, Debug)]
pub enum DiagnosisError {
    /// The input could not be decoded or converted to RGB.
    /// The caller may retry with a different file.
    #[error("Unsupported image format at '{path}': {reason}")]
    UnsupportedImageFormat { path: PathBuf, reason: String },

    /// Checkpoint missing or corrupt. Fatal at startup.
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// Shape or runtime mismatch during a single inference call
    #[error("Inference error: {0}")]
    Inference(String),

    /// A registry label has no knowledge base record
    #[error("Knowledge base has no record for label '{label}'")]
    KnowledgeBaseGap { label: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DiagnosisError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosisError::Serialization(err.to_string())
    }
}

impl DiagnosisError {
    /// Build an `UnsupportedImageFormat` error for an in-memory or on-disk image
    pub fn unsupported_image(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DiagnosisError::UnsupportedImageFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience Result type for plant diagnosis operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;
