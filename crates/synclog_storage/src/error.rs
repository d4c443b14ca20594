//! Error types for sequence store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The counter for a stream has not been created yet.
    #[error("sequence not found: {key}")]
    SequenceNotFound {
        /// The encoded stream key.
        key: String,
    },

    /// The backing store cannot be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The persisted state is corrupted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,
}

impl StorageError {
    /// Creates a sequence-not-found error.
    pub fn sequence_not_found(key: impl Into<String>) -> Self {
        Self::SequenceNotFound { key: key.into() }
    }

    /// Returns true if the caller may retry the whole logical write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(StorageError::Unavailable("db down".into()).is_retryable());
        assert!(StorageError::Io(io::Error::other("reset")).is_retryable());
        assert!(!StorageError::sequence_not_found("entity:a").is_retryable());
        assert!(!StorageError::Locked.is_retryable());
    }

    #[test]
    fn display_names_key() {
        let err = StorageError::sequence_not_found("named:inbox");
        assert_eq!(err.to_string(), "sequence not found: named:inbox");
    }
}
