//! Error Types
//!
//! Defines the error taxonomy for the memory cache.

use thiserror::Error;

/// Result type alias using memtier-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Memory cache errors
#[derive(Debug, Error)]
pub enum Error {
    /// Accessor used before the backing store was loaded
    #[error("{store} accessed before load()")]
    NotLoaded { store: &'static str },

    /// Vector length disagrees with the configured dimensionality
    #[error("dimension mismatch for '{id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// Persisted index was built by a different embedding provider
    #[error("embedding provider mismatch: stored {stored}/{stored_dimensions}, configured {configured}/{configured_dimensions}")]
    ProviderMismatch {
        stored: String,
        stored_dimensions: usize,
        configured: String,
        configured_dimensions: usize,
    },

    /// Persisted file uses an unsupported schema version
    #[error("schema version mismatch: found {found}, expected {expected}")]
    SchemaVersionMismatch { found: u32, expected: u32 },

    /// A single corrupt record (line or entry)
    #[error("malformed record at {location}: {message}")]
    MalformedRecord { location: String, message: String },

    /// Embedding provider failure
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Extraction collaborator failure
    #[error("entry source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a not-loaded error
    pub fn not_loaded(store: &'static str) -> Self {
        Self::NotLoaded { store }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(id: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            id: id.into(),
            expected,
            actual,
        }
    }

    /// Create a malformed record error
    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an entry source error
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Check if this error is a not-loaded error
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Self::NotLoaded { .. })
    }

    /// Check if this error is a dimension mismatch
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}
