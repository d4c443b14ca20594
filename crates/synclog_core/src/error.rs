//! Error types for synclog core.

use crate::types::StreamKind;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sequence/head store error.
    #[error("storage error: {0}")]
    Storage(#[from] synclog_storage::StorageError),

    /// A stream key has an empty or otherwise unusable component.
    #[error("invalid stream key: {message}")]
    InvalidStreamKey {
        /// Description of the problem.
        message: String,
    },

    /// A store was handed a stream of a kind it does not hold.
    #[error("stream {stream} is not a {expected:?} stream")]
    WrongStreamKind {
        /// The offending stream.
        stream: String,
        /// The kind the store accepts.
        expected: StreamKind,
    },

    /// A grouping payload could not be encoded or decoded.
    #[error("grouping codec error: {message}")]
    GroupingCodec {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid stream key error.
    pub fn invalid_stream_key(message: impl Into<String>) -> Self {
        Self::InvalidStreamKey {
            message: message.into(),
        }
    }

    /// Creates a grouping codec error.
    pub fn grouping_codec(message: impl Into<String>) -> Self {
        Self::GroupingCodec {
            message: message.into(),
        }
    }

    /// Returns true if retrying the whole logical write may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synclog_storage::StorageError;

    #[test]
    fn storage_errors_keep_retryability() {
        let err: CoreError = StorageError::Unavailable("connection refused".into()).into();
        assert!(err.is_retryable());

        let err: CoreError = StorageError::sequence_not_found("entity:a").into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn wrong_kind_display() {
        let err = CoreError::WrongStreamKind {
            stream: "named:inbox".into(),
            expected: StreamKind::Grouping,
        };
        assert_eq!(err.to_string(), "stream named:inbox is not a Grouping stream");
    }
}
