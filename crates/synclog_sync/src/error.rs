//! Error types for the sync layer.

use synclog_core::{CommitId, CoreError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while exporting, importing or tracking cursors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Commit or store failure from the core layer.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The requested cursor is newer than anything this stream ever issued.
    ///
    /// The partner should drop its cursor and perform a full resync.
    #[error("stale cursor: since {since} is ahead of head {head}")]
    StaleCursor {
        /// Cursor supplied by the partner.
        since: CommitId,
        /// Current stream head.
        head: CommitId,
    },

    /// A confirmation named a commit the stream has not issued.
    #[error("cannot confirm {cursor}: stream head is {head}")]
    CursorAhead {
        /// Value the caller tried to confirm.
        cursor: CommitId,
        /// Current stream head.
        head: CommitId,
    },

    /// A confirmation would move the cursor backwards.
    #[error("cannot move cursor from {cursor} back to {requested}")]
    CursorRegression {
        /// Current cursor.
        cursor: CommitId,
        /// Value the caller tried to confirm.
        requested: CommitId,
    },

    /// No partner with this remote id.
    #[error("partner not found: {0}")]
    PartnerNotFound(String),

    /// A partner with this remote id already exists.
    #[error("partner already exists: {0}")]
    PartnerExists(String),

    /// A named stream with no registered store.
    #[error("no store registered for stream {0}")]
    UnknownStream(String),

    /// An imported change could not be applied.
    #[error("invalid import: {message}")]
    InvalidImport {
        /// Error message.
        message: String,
    },
}

impl SyncError {
    /// Creates an invalid import error.
    pub fn invalid_import(message: impl Into<String>) -> Self {
        Self::InvalidImport {
            message: message.into(),
        }
    }

    /// Returns true if the same request may succeed when retried unchanged.
    ///
    /// Only transient storage failures qualify; the caller should retry with
    /// the same cursor.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Core(err) => err.is_retryable(),
            _ => false,
        }
    }
}
