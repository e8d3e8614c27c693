//! Error types for the blob cache
//!
//! Provides unified error handling using thiserror. These errors only
//! surface from the on-disk layer; the cache operations themselves degrade
//! silently instead of failing the host.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the blob cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing a persisted blob failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted blob could not be decoded by the codec
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Key cannot be mapped to a file name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A blocking disk task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CacheError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the blob cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let err = CacheError::io(
            "/tmp/blobs/abc.gz",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/blobs/abc.gz"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_invalid_key_display() {
        let err = CacheError::InvalidKey("../etc".to_string());
        assert_eq!(err.to_string(), "Invalid key: ../etc");
    }
}
