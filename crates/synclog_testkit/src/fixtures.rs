//! Test fixtures and harness helpers.
//!
//! Provides a fully wired in-memory sync setup and file-backed sequence
//! store fixtures.

use std::sync::Arc;
use synclog_core::{
    CommitId, CommitManager, EntityId, EntityStore, InMemoryEntityStore, InMemoryGroupingStore,
    StreamKey,
};
use synclog_storage::{FileSequenceStore, InMemorySequenceStore, SequenceStore};
use synclog_sync::{Change, Collection, InMemoryPartnerStore, SyncConfig, SyncService};
use tempfile::TempDir;

/// In-memory stores wired into a [`SyncService`].
pub struct SyncHarness {
    /// The sequence store behind the commit manager.
    pub sequences: Arc<dyn SequenceStore>,
    /// The commit manager shared by every store.
    pub commits: CommitManager,
    /// Entity store for entity streams.
    pub entities: Arc<InMemoryEntityStore>,
    /// Grouping store for grouping streams.
    pub groupings: Arc<InMemoryGroupingStore>,
    /// Partner store.
    pub partners: Arc<InMemoryPartnerStore>,
    /// The service under test.
    pub service: SyncService,
}

impl SyncHarness {
    /// Creates a harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Creates a harness with an explicit sync configuration.
    pub fn with_config(config: SyncConfig) -> Self {
        Self::with_sequences(Arc::new(InMemorySequenceStore::new()), config)
    }

    /// Creates a harness over a caller-supplied sequence store.
    pub fn with_sequences(sequences: Arc<dyn SequenceStore>, config: SyncConfig) -> Self {
        let commits = CommitManager::new(Arc::clone(&sequences));
        let entities = Arc::new(InMemoryEntityStore::new(commits.clone()));
        let groupings = Arc::new(InMemoryGroupingStore::new(commits.clone()));
        let partners = Arc::new(InMemoryPartnerStore::new());
        let service = SyncService::with_config(
            commits.clone(),
            entities.clone(),
            groupings.clone(),
            partners.clone(),
            config,
        );
        Self {
            sequences,
            commits,
            entities,
            groupings,
            partners,
            service,
        }
    }

    /// Saves a new entity and returns its id and commit.
    pub fn save(&self, stream: &StreamKey, payload: Vec<u8>) -> (EntityId, CommitId) {
        let id = EntityId::new();
        let commit = self
            .entities
            .save(stream, id, payload)
            .expect("Failed to save entity");
        (id, commit)
    }

    /// Returns the head of `stream`.
    pub fn head(&self, stream: &StreamKey) -> CommitId {
        self.commits
            .head_commit(stream)
            .expect("Failed to read head")
    }
}

impl Default for SyncHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SyncHarness {
    type Target = SyncService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

/// Runs a test with a fresh in-memory harness.
pub fn with_harness<F, R>(f: F) -> R
where
    F: FnOnce(&SyncHarness) -> R,
{
    let harness = SyncHarness::new();
    f(&harness)
}

/// Exports and confirms until the collection is caught up. Returns every
/// change in export order.
pub fn drain(collection: &Collection) -> Vec<Change> {
    let mut changes = Vec::new();
    loop {
        let batch = collection.export_pending().expect("Failed to export");
        changes.extend(batch.changes);
        collection
            .confirm_exported(batch.new_head)
            .expect("Failed to confirm");
        if !batch.has_more {
            return changes;
        }
    }
}

/// A file-backed sequence store in a temporary directory.
pub struct TempSequenceStore {
    /// The open store, if any.
    store: Option<Arc<FileSequenceStore>>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TempSequenceStore {
    /// Creates and opens a store in a new temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileSequenceStore::open(temp_dir.path()).expect("Failed to open store");
        Self {
            store: Some(Arc::new(store)),
            temp_dir,
        }
    }

    /// Returns the open store.
    pub fn store(&self) -> Arc<FileSequenceStore> {
        Arc::clone(self.store.as_ref().expect("Store is closed"))
    }

    /// Closes and reopens the store from disk.
    ///
    /// Every clone handed out by [`store`](Self::store) must be dropped
    /// first, otherwise the directory lock is still held.
    pub fn reopen(&mut self) -> Arc<FileSequenceStore> {
        self.store = None;
        let store =
            FileSequenceStore::open(self.temp_dir.path()).expect("Failed to reopen store");
        self.store = Some(Arc::new(store));
        self.store()
    }

    /// Returns the store directory.
    pub fn path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

impl Default for TempSequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_wires_one_commit_manager() {
        with_harness(|harness| {
            let stream = StreamKey::entity("customer");
            let (_, commit) = harness.save(&stream, vec![1]);
            assert_eq!(harness.head(&stream), commit);
        });
    }

    #[test]
    fn drain_follows_pages() {
        let harness = SyncHarness::with_config(SyncConfig::new().with_max_changes_per_export(1));
        let stream = StreamKey::entity("customer");
        for i in 0..3u8 {
            harness.save(&stream, vec![i]);
        }

        let partner = harness.create_partner("phone", "user-1").unwrap();
        let collection = partner.collection(stream.clone()).unwrap();
        assert_eq!(drain(&collection).len(), 3);
        assert_eq!(collection.last_commit_id().unwrap(), harness.head(&stream));
    }

    #[test]
    fn temp_store_reopens() {
        let mut temp = TempSequenceStore::new();
        temp.store().create_sequence("entity:a").unwrap();
        assert_eq!(temp.store().next_value("entity:a").unwrap(), 1);

        let store = temp.reopen();
        assert_eq!(store.next_value("entity:a").unwrap(), 2);
    }
}
