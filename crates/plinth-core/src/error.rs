//! Error types for plinth.

use thiserror::Error;

/// Result type alias using plinth's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for plinth operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Miniature not found
    #[error("Miniature not found: {0}")]
    MiniatureNotFound(i64),

    /// Invalid input rejected before any backend call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A name collision or blocked delete detected by a pre-check read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// HTTP/network request failed (image endpoint)
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
