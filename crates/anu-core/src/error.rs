use thiserror::Error;

/// Application-wide error types for Anu.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport-level failure while fetching a resource (DNS, refused, timeout).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The structured-data block of a lesson page is missing or unparsable.
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// Writing to (or reading from) the durable cache store failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A spawned fetch task panicked or was aborted.
    #[error("Task error: {0}")]
    TaskError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

/// Coarse classification of an [`AppError`], used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    MalformedPage,
    Store,
    Other,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NetworkError(_) => ErrorKind::Network,
            AppError::MalformedPage(_) => ErrorKind::MalformedPage,
            AppError::StoreError(_) => ErrorKind::Store,
            _ => ErrorKind::Other,
        }
    }
}
