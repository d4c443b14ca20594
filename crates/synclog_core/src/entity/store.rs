//! Entity store interface and in-memory implementation.

use crate::commit::CommitManager;
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::table::RowTable;
use crate::types::{CommitId, StreamKey, StreamKind};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A live entity row and the commit id of its last write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    /// Entity id.
    pub id: EntityId,
    /// Opaque entity payload.
    pub payload: Vec<u8>,
    /// Commit id stamped at the last save.
    pub commit_id: CommitId,
}

/// A deletion record: the id that was removed and the commit id of the delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    /// Removed id.
    pub id: EntityId,
    /// Commit id stamped at delete time.
    pub commit_id: CommitId,
}

/// Load/save access to entity rows of entity and named streams.
///
/// Every write mints a fresh commit id through a [`CommitManager`] and stamps
/// it on the row (or on a tombstone for deletes).
///
/// # Preconditions
///
/// Allocating a commit id and stamping it on the row must become visible to
/// `changed_since`/`deleted_since` readers atomically. Otherwise a reader
/// could observe a head whose row is not written yet and a partner cursor
/// would skip it for good.
pub trait EntityStore: Send + Sync {
    /// Returns the live row for `id`, if any.
    fn get(&self, stream: &StreamKey, id: EntityId) -> CoreResult<Option<EntityRow>>;

    /// Returns live rows with a commit id above `since`, ordered by
    /// (commit id, entity id).
    fn changed_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<EntityRow>>;

    /// Returns tombstones with a commit id above `since`, ordered by
    /// (commit id, entity id).
    fn deleted_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<Tombstone>>;

    /// Creates or replaces a row and returns its new commit id.
    fn save(&self, stream: &StreamKey, id: EntityId, payload: Vec<u8>) -> CoreResult<CommitId>;

    /// Deletes a row and returns the commit id stamped on its tombstone.
    ///
    /// Deleting an id that has no live row still records a tombstone, so the
    /// removal is visible to every partner.
    fn delete(&self, stream: &StreamKey, id: EntityId) -> CoreResult<CommitId>;

    /// Returns the head of `stream` as seen by the commit source that stamps
    /// this store's rows.
    fn head_commit(&self, stream: &StreamKey) -> CoreResult<CommitId>;
}

/// An in-memory entity store.
///
/// One write lock covers commit allocation and row stamping, which satisfies
/// the visibility precondition of [`EntityStore`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use synclog_core::{CommitId, CommitManager, EntityId, EntityStore, InMemoryEntityStore, StreamKey};
/// use synclog_storage::InMemorySequenceStore;
///
/// let commits = CommitManager::new(Arc::new(InMemorySequenceStore::new()));
/// let store = InMemoryEntityStore::new(commits);
/// let customers = StreamKey::entity("customer");
///
/// let commit = store.save(&customers, EntityId::new(), b"Acme".to_vec()).unwrap();
/// assert_eq!(store.changed_since(&customers, CommitId::ZERO).unwrap().len(), 1);
/// assert_eq!(commit, CommitId::new(1));
/// ```
pub struct InMemoryEntityStore {
    commits: CommitManager,
    tables: RwLock<HashMap<StreamKey, RowTable<Vec<u8>>>>,
}

impl InMemoryEntityStore {
    /// Creates an empty store that stamps rows through `commits`.
    pub fn new(commits: CommitManager) -> Self {
        Self {
            commits,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the commit manager.
    pub fn commits(&self) -> &CommitManager {
        &self.commits
    }

    /// Returns the number of live rows in `stream`.
    pub fn count(&self, stream: &StreamKey) -> usize {
        self.tables.read().get(stream).map_or(0, RowTable::len)
    }

    fn check(stream: &StreamKey) -> CoreResult<()> {
        stream.validate()?;
        if stream.kind() == StreamKind::Grouping {
            return Err(CoreError::WrongStreamKind {
                stream: stream.storage_key(),
                expected: StreamKind::Entity,
            });
        }
        Ok(())
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, stream: &StreamKey, id: EntityId) -> CoreResult<Option<EntityRow>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        Ok(tables
            .get(stream)
            .and_then(|table| table.get(&id))
            .map(|(payload, commit_id)| EntityRow {
                id,
                payload: payload.clone(),
                commit_id,
            }))
    }

    fn changed_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<EntityRow>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        Ok(tables
            .get(stream)
            .map(|table| {
                table
                    .changed_since(since)
                    .into_iter()
                    .map(|(id, payload, commit_id)| EntityRow {
                        id,
                        payload,
                        commit_id,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn deleted_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<Tombstone>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        Ok(tables
            .get(stream)
            .map(|table| {
                table
                    .deleted_since(since)
                    .into_iter()
                    .map(|(id, commit_id)| Tombstone { id, commit_id })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn save(&self, stream: &StreamKey, id: EntityId, payload: Vec<u8>) -> CoreResult<CommitId> {
        Self::check(stream)?;
        let mut tables = self.tables.write();
        let commit = self.commits.create_commit(stream)?;
        tables
            .entry(stream.clone())
            .or_default()
            .put(id, payload, commit);
        Ok(commit)
    }

    fn delete(&self, stream: &StreamKey, id: EntityId) -> CoreResult<CommitId> {
        Self::check(stream)?;
        let mut tables = self.tables.write();
        let commit = self.commits.create_commit(stream)?;
        tables.entry(stream.clone()).or_default().remove(id, commit);
        Ok(commit)
    }

    fn head_commit(&self, stream: &StreamKey) -> CoreResult<CommitId> {
        Self::check(stream)?;
        self.commits.head_commit(stream)
    }
}
