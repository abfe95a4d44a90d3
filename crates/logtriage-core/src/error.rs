//! Error types for logtriage

/// Result type alias using logtriage's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for logtriage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier execution errors (model inference, tokenization, bad artifact data)
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Remote classification service errors
    #[error("remote error: {0}")]
    Remote(String),

    /// Configuration errors; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new remote service error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error must abort startup rather than fail a single record
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
