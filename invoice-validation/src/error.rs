//! Error types for the validation engine

use thiserror::Error;

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Validation engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Financial calculation could not produce a value
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// Input could not be read as an invoice record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Configuration violates an invariant
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Batch aggregate could not be updated
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Batch was cancelled by the caller
    #[error("Batch cancelled after {processed} records")]
    Cancelled {
        /// Records fully processed before cancellation
        processed: usize,
    },

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
