//! Error types for cache operations
//!
//! Most cache operations are fail-safe and never surface these errors to
//! callers; they are returned by the lower-level helpers (snapshot I/O,
//! configuration) and logged by the cache itself.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the image cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Snapshot file could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
