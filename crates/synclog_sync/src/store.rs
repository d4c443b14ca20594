//! Persistence of partners, cursors and import logs.

use crate::error::{SyncError, SyncResult};
use crate::partner::PartnerId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use synclog_core::{CommitId, EntityId, StreamKey};

/// A stored partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerRecord {
    /// Local partner id.
    pub id: PartnerId,
    /// The partner's own device or account id.
    pub remote_id: String,
    /// The local user the partner syncs for.
    pub owner_id: String,
    /// Last completed sync, as Unix milliseconds.
    pub last_sync: Option<u64>,
}

/// The cursor of one (partner, stream) binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Highest commit the partner confirmed.
    pub last_commit_id: CommitId,
    /// Incremented on every cursor change.
    pub revision: u64,
}

/// One applied import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// The partner's id for the object.
    pub remote_id: String,
    /// The partner's revision that was applied.
    pub remote_revision: i64,
    /// Local id the import was written to.
    pub local_id: EntityId,
    /// Commit id the import minted locally.
    pub local_commit: CommitId,
    /// True if the import was a delete.
    pub deleted: bool,
}

/// Storage for partners and their per-stream state.
///
/// Cursor updates go through [`update_cursor`](PartnerStore::update_cursor)
/// so a check and the write happen under one lock.
pub trait PartnerStore: Send + Sync {
    /// Inserts a partner. Fails with `PartnerExists` if the remote id is taken.
    fn insert_partner(&self, record: PartnerRecord) -> SyncResult<()>;

    /// Looks up a partner by its remote id.
    fn partner(&self, remote_id: &str) -> SyncResult<Option<PartnerRecord>>;

    /// Replaces a stored partner record.
    fn update_partner(&self, record: &PartnerRecord) -> SyncResult<()>;

    /// Deletes a partner with all its cursors and import logs.
    fn delete_partner(&self, partner: PartnerId) -> SyncResult<bool>;

    /// Returns the cursor of a binding, if it exists.
    fn cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<Option<CursorState>>;

    /// Creates a binding at cursor zero unless it already exists, and returns
    /// its cursor.
    fn ensure_cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<CursorState>;

    /// Atomically replaces a cursor with the result of `update`.
    ///
    /// A missing binding is created first. If `update` fails nothing is
    /// written.
    fn update_cursor(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        update: &dyn Fn(CursorState) -> SyncResult<CursorState>,
    ) -> SyncResult<CursorState>;

    /// Lists the streams bound to a partner.
    fn streams(&self, partner: PartnerId) -> SyncResult<Vec<StreamKey>>;

    /// Removes a binding and its import log.
    fn remove_cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<bool>;

    /// Returns the import log of a binding, ordered by local commit.
    fn imports(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<Vec<ImportRecord>>;

    /// Looks up the import record for one remote id.
    fn import_by_remote_id(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        remote_id: &str,
    ) -> SyncResult<Option<ImportRecord>>;

    /// Returns the imports whose local commit is above `since`, ordered by
    /// local commit.
    fn imports_since(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        since: CommitId,
    ) -> SyncResult<Vec<ImportRecord>>;

    /// Records an import, replacing an earlier record for the same remote id.
    fn log_import(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        record: ImportRecord,
    ) -> SyncResult<()>;

    /// Drops up to `limit` delete records at or below `up_to`. Returns the
    /// number dropped.
    fn prune_imports(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        up_to: CommitId,
        limit: usize,
    ) -> SyncResult<usize>;
}

/// Import records of one binding, keyed by remote id and indexed by local
/// commit.
#[derive(Default)]
struct ImportLog {
    by_remote: HashMap<String, ImportRecord>,
    by_commit: BTreeSet<(CommitId, String)>,
}

impl ImportLog {
    fn upsert(&mut self, record: ImportRecord) {
        if let Some(old) = self.by_remote.get(&record.remote_id) {
            self.by_commit.remove(&(old.local_commit, old.remote_id.clone()));
        }
        self.by_commit
            .insert((record.local_commit, record.remote_id.clone()));
        self.by_remote.insert(record.remote_id.clone(), record);
    }

    fn remove(&mut self, key: &(CommitId, String)) {
        self.by_commit.remove(key);
        self.by_remote.remove(&key.1);
    }

    fn ordered<'a>(
        &'a self,
        keys: impl Iterator<Item = &'a (CommitId, String)>,
    ) -> Vec<ImportRecord> {
        keys.filter_map(|(_, remote_id)| self.by_remote.get(remote_id).cloned())
            .collect()
    }

    fn above(&self, since: CommitId) -> Vec<ImportRecord> {
        let from = (CommitId::new(since.as_i64().saturating_add(1)), String::new());
        self.ordered(self.by_commit.range(from..))
    }
}

#[derive(Default)]
struct Tables {
    partners: HashMap<PartnerId, PartnerRecord>,
    cursors: BTreeMap<(PartnerId, StreamKey), CursorState>,
    imports: HashMap<(PartnerId, StreamKey), ImportLog>,
}

/// An in-memory partner store.
#[derive(Default)]
pub struct InMemoryPartnerStore {
    tables: RwLock<Tables>,
}

impl InMemoryPartnerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of partners.
    pub fn partner_count(&self) -> usize {
        self.tables.read().partners.len()
    }
}

impl PartnerStore for InMemoryPartnerStore {
    fn insert_partner(&self, record: PartnerRecord) -> SyncResult<()> {
        let mut tables = self.tables.write();
        if tables
            .partners
            .values()
            .any(|existing| existing.remote_id == record.remote_id)
        {
            return Err(SyncError::PartnerExists(record.remote_id));
        }
        tables.partners.insert(record.id, record);
        Ok(())
    }

    fn partner(&self, remote_id: &str) -> SyncResult<Option<PartnerRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .partners
            .values()
            .find(|record| record.remote_id == remote_id)
            .cloned())
    }

    fn update_partner(&self, record: &PartnerRecord) -> SyncResult<()> {
        let mut tables = self.tables.write();
        match tables.partners.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(SyncError::PartnerNotFound(record.remote_id.clone())),
        }
    }

    fn delete_partner(&self, partner: PartnerId) -> SyncResult<bool> {
        let mut tables = self.tables.write();
        let removed = tables.partners.remove(&partner).is_some();
        tables.cursors.retain(|(owner, _), _| *owner != partner);
        tables.imports.retain(|(owner, _), _| *owner != partner);
        Ok(removed)
    }

    fn cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<Option<CursorState>> {
        let tables = self.tables.read();
        Ok(tables.cursors.get(&(partner, stream.clone())).copied())
    }

    fn ensure_cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<CursorState> {
        let mut tables = self.tables.write();
        Ok(*tables
            .cursors
            .entry((partner, stream.clone()))
            .or_default())
    }

    fn update_cursor(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        update: &dyn Fn(CursorState) -> SyncResult<CursorState>,
    ) -> SyncResult<CursorState> {
        let mut tables = self.tables.write();
        let cursor = tables
            .cursors
            .entry((partner, stream.clone()))
            .or_default();
        let next = update(*cursor)?;
        *cursor = next;
        Ok(next)
    }

    fn streams(&self, partner: PartnerId) -> SyncResult<Vec<StreamKey>> {
        let tables = self.tables.read();
        Ok(tables
            .cursors
            .keys()
            .filter(|(owner, _)| *owner == partner)
            .map(|(_, stream)| stream.clone())
            .collect())
    }

    fn remove_cursor(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<bool> {
        let mut tables = self.tables.write();
        let key = (partner, stream.clone());
        tables.imports.remove(&key);
        Ok(tables.cursors.remove(&key).is_some())
    }

    fn imports(&self, partner: PartnerId, stream: &StreamKey) -> SyncResult<Vec<ImportRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .imports
            .get(&(partner, stream.clone()))
            .map(|log| log.ordered(log.by_commit.iter()))
            .unwrap_or_default())
    }

    fn import_by_remote_id(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        remote_id: &str,
    ) -> SyncResult<Option<ImportRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .imports
            .get(&(partner, stream.clone()))
            .and_then(|log| log.by_remote.get(remote_id))
            .cloned())
    }

    fn imports_since(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        since: CommitId,
    ) -> SyncResult<Vec<ImportRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .imports
            .get(&(partner, stream.clone()))
            .map(|log| log.above(since))
            .unwrap_or_default())
    }

    fn log_import(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        record: ImportRecord,
    ) -> SyncResult<()> {
        let mut tables = self.tables.write();
        tables
            .imports
            .entry((partner, stream.clone()))
            .or_default()
            .upsert(record);
        Ok(())
    }

    fn prune_imports(
        &self,
        partner: PartnerId,
        stream: &StreamKey,
        up_to: CommitId,
        limit: usize,
    ) -> SyncResult<usize> {
        let mut tables = self.tables.write();
        let Some(log) = tables.imports.get_mut(&(partner, stream.clone())) else {
            return Ok(0);
        };

        let stale: Vec<(CommitId, String)> = log
            .by_commit
            .iter()
            .take_while(|(commit, _)| *commit <= up_to)
            .filter(|(_, remote_id)| log.by_remote.get(remote_id).is_some_and(|r| r.deleted))
            .take(limit)
            .cloned()
            .collect();
        for key in &stale {
            log.remove(key);
        }
        Ok(stale.len())
    }
}
