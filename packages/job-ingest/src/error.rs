//! Typed errors for the ingestion library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur inside the ingestion core.
#[derive(Debug, Error)]
pub enum IngestError {
    /// AI extraction call failed or returned unusable output
    #[error("AI service error: {0}")]
    Ai(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Durable store operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Record not found in store
    #[error("job not found: {id}")]
    NotFound { id: String },

    /// Invalid search query provided
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error (fatal at startup)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Wrap any displayable error as a storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string().into())
    }

    /// Wrap any displayable error as an AI failure.
    pub fn ai(err: impl std::fmt::Display) -> Self {
        Self::Ai(err.to_string().into())
    }
}

/// Errors raised by a fetch adapter. Isolated to the failing source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP or other transport failure
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The adapter did not finish within its deadline
    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The source responded with something we could not read
    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

/// Invalid settings or missing credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting is outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A required credential or setting is absent
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for fetch adapter operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
