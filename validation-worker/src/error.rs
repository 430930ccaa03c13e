//! Error types for the validation worker

use thiserror::Error;

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Worker errors
#[derive(Error, Debug)]
pub enum Error {
    /// Validation engine error
    #[error("Engine error: {0}")]
    Engine(#[from] invoice_validation::Error),

    /// Request could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error
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
