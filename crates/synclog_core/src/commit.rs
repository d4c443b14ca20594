//! Commit id allocation and head tracking.

use crate::config::CommitConfig;
use crate::error::CoreResult;
use crate::types::{CommitId, StreamKey};
use std::fmt;
use std::sync::Arc;
use synclog_storage::{SequenceStore, StorageError};

/// Hands out monotonically increasing commit ids per stream.
///
/// The manager is a thin, stateless wrapper over a [`SequenceStore`]. It never
/// caches a head in memory and takes no locks of its own: ordering and
/// uniqueness come entirely from the store's atomic counter, so sharing one
/// manager (or many clones of it) between threads does not weaken that
/// guarantee.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use synclog_core::{CommitId, CommitManager, StreamKey};
/// use synclog_storage::InMemorySequenceStore;
///
/// let commits = CommitManager::new(Arc::new(InMemorySequenceStore::new()));
/// let stream = StreamKey::entity("customer");
///
/// assert_eq!(commits.head_commit(&stream).unwrap(), CommitId::ZERO);
/// let id = commits.create_commit(&stream).unwrap();
/// assert_eq!(commits.head_commit(&stream).unwrap(), id);
/// ```
#[derive(Clone)]
pub struct CommitManager {
    store: Arc<dyn SequenceStore>,
    config: CommitConfig,
}

impl CommitManager {
    /// Creates a manager over `store` with the default configuration.
    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self::with_config(store, CommitConfig::default())
    }

    /// Creates a manager with an explicit configuration.
    pub fn with_config(store: Arc<dyn SequenceStore>, config: CommitConfig) -> Self {
        Self { store, config }
    }

    /// Returns the underlying sequence store.
    pub fn store(&self) -> &Arc<dyn SequenceStore> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CommitConfig {
        &self.config
    }

    /// Allocates the next commit id for `stream` and publishes it as head.
    ///
    /// If the stream's counter does not exist yet it is created and the
    /// allocation is retried exactly once. Any other storage failure, or a
    /// failure of that single retry, is returned to the caller, who owns the
    /// decision to retry the whole logical write.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidStreamKey` for empty key components and
    /// `CoreError::Storage` for store failures.
    pub fn create_commit(&self, stream: &StreamKey) -> CoreResult<CommitId> {
        stream.validate()?;
        let key = stream.storage_key();

        let value = match self.store.next_value(&key) {
            Ok(value) => value,
            Err(StorageError::SequenceNotFound { .. }) if self.config.lazy_create_sequences => {
                tracing::info!(stream = %stream, "initializing commit sequence");
                self.store.create_sequence(&key)?;
                self.store.next_value(&key)?
            }
            Err(err) => return Err(err.into()),
        };

        self.store.set_head(&key, value)?;
        tracing::trace!(stream = %stream, commit = value, "created commit");
        Ok(CommitId::new(value))
    }

    /// Returns the head commit of `stream`, or [`CommitId::ZERO`] if the
    /// stream has never been committed to.
    pub fn head_commit(&self, stream: &StreamKey) -> CoreResult<CommitId> {
        stream.validate()?;
        Ok(CommitId::new(self.store.head(&stream.storage_key())?))
    }
}

impl fmt::Debug for CommitManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
