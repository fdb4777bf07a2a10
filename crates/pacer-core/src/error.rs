//! Error types for pacer

use thiserror::Error;

/// Main error type for pacer
#[derive(Error, Debug)]
pub enum PacerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for pacer operations
pub type Result<T> = std::result::Result<T, PacerError>;
