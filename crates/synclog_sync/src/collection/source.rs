//! Stores a collection can read and write.

use crate::change::Change;
use crate::error::{SyncError, SyncResult};
use std::sync::Arc;
use synclog_core::{CommitId, EntityId, EntityStore, Grouping, GroupingStore, StreamKey};

/// The store behind a collection. Entity and named streams share the row
/// variant.
#[derive(Clone)]
pub(crate) enum Source {
    Rows(Arc<dyn EntityStore>),
    Groupings(Arc<dyn GroupingStore>),
}

impl Source {
    /// Live changes above `since`, with payloads.
    pub(crate) fn changed_since(
        &self,
        stream: &StreamKey,
        since: CommitId,
    ) -> SyncResult<Vec<Change>> {
        match self {
            Source::Rows(store) => Ok(store
                .changed_since(stream, since)?
                .into_iter()
                .map(|row| Change::changed(row.id, row.commit_id, row.payload))
                .collect()),
            Source::Groupings(store) => store
                .changed_since(stream, since)?
                .into_iter()
                .map(|grouping| -> SyncResult<Change> {
                    let payload = grouping.encode()?;
                    Ok(Change::changed(grouping.id, grouping.commit_id, payload))
                })
                .collect(),
        }
    }

    /// Deletes above `since`.
    pub(crate) fn deleted_since(
        &self,
        stream: &StreamKey,
        since: CommitId,
    ) -> SyncResult<Vec<Change>> {
        let tombstones = match self {
            Source::Rows(store) => store.deleted_since(stream, since)?,
            Source::Groupings(store) => store.deleted_since(stream, since)?,
        };
        Ok(tombstones
            .into_iter()
            .map(|tombstone| Change::deleted(tombstone.id, tombstone.commit_id))
            .collect())
    }

    /// Writes an imported payload under `id` and returns the row's commit id.
    pub(crate) fn save(
        &self,
        stream: &StreamKey,
        id: EntityId,
        payload: Vec<u8>,
    ) -> SyncResult<CommitId> {
        match self {
            Source::Rows(store) => Ok(store.save(stream, id, payload)?),
            Source::Groupings(store) => {
                let mut grouping = Grouping::decode(&payload)
                    .map_err(|e| SyncError::invalid_import(e.to_string()))?;
                grouping.id = id;
                Ok(store.save_grouping(stream, &grouping)?)
            }
        }
    }

    pub(crate) fn delete(&self, stream: &StreamKey, id: EntityId) -> SyncResult<CommitId> {
        match self {
            Source::Rows(store) => Ok(store.delete(stream, id)?),
            Source::Groupings(store) => Ok(store.delete_grouping(stream, id)?),
        }
    }

    /// Head of `stream` from the commit source that stamps this store.
    pub(crate) fn head_commit(&self, stream: &StreamKey) -> SyncResult<CommitId> {
        match self {
            Source::Rows(store) => Ok(store.head_commit(stream)?),
            Source::Groupings(store) => Ok(store.head_commit(stream)?),
        }
    }
}
