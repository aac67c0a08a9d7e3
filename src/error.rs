//! Crate-wide error type and result alias

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BatchmlError>;

/// Errors produced by the pipeline
#[derive(Error, Debug)]
pub enum BatchmlError {
    /// Dataset could not be read or parsed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Classifier training failed
    #[error("Training error: {0}")]
    Training(String),

    /// No persisted model exists where one was expected
    #[error("No trained model found in {0}")]
    ModelNotFound(String),

    /// Model serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Permanent capability absence; invoking this is a programming error
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited-record read failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
