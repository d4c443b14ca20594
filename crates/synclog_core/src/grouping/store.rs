use super::Grouping;
use crate::commit::CommitManager;
use crate::entity::{EntityId, Tombstone};
use crate::error::CoreResult;
use crate::table::RowTable;
use crate::types::{CommitId, StreamKey, StreamKind};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Access to the groupings of grouping streams.
///
/// A batch save mints at most one commit id for the whole batch. The same
/// visibility precondition as [`EntityStore`](crate::EntityStore) applies.
pub trait GroupingStore: Send + Sync {
    /// Returns all live groupings, ordered by sort order then id.
    fn groupings(&self, stream: &StreamKey) -> CoreResult<Vec<Grouping>>;

    /// Returns one live grouping.
    fn get(&self, stream: &StreamKey, id: EntityId) -> CoreResult<Option<Grouping>>;

    /// Returns groupings changed after `since`, ordered by (commit id, id).
    fn changed_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<Grouping>>;

    /// Returns grouping tombstones after `since`, ordered by (commit id, id).
    fn deleted_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<Tombstone>>;

    /// Saves a batch of groupings under one commit id.
    ///
    /// Only groupings whose value differs from the stored one are stamped;
    /// unchanged groupings keep their previous commit id. When nothing in the
    /// batch changed no commit is made and the current head is returned.
    fn save_groupings(&self, stream: &StreamKey, groupings: &[Grouping]) -> CoreResult<CommitId>;

    /// Saves one grouping under a fresh commit id, even if its value is
    /// unchanged.
    ///
    /// Imports go through here: every applied remote change must leave the
    /// grouping with a commit id above anything it carried before.
    fn save_grouping(&self, stream: &StreamKey, grouping: &Grouping) -> CoreResult<CommitId>;

    /// Deletes a grouping and returns the commit id of its tombstone.
    fn delete_grouping(&self, stream: &StreamKey, id: EntityId) -> CoreResult<CommitId>;

    /// Returns the head of `stream` as seen by the commit source that stamps
    /// this store's groupings.
    fn head_commit(&self, stream: &StreamKey) -> CoreResult<CommitId>;
}

/// An in-memory grouping store.
pub struct InMemoryGroupingStore {
    commits: CommitManager,
    tables: RwLock<HashMap<StreamKey, RowTable<Grouping>>>,
}

impl InMemoryGroupingStore {
    /// Creates an empty store that stamps groupings through `commits`.
    pub fn new(commits: CommitManager) -> Self {
        Self {
            commits,
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn check(stream: &StreamKey) -> CoreResult<()> {
        stream.validate()?;
        stream.expect_kind(StreamKind::Grouping)
    }
}

fn stamped(grouping: &Grouping, commit_id: CommitId) -> Grouping {
    Grouping {
        commit_id,
        ..grouping.clone()
    }
}

impl GroupingStore for InMemoryGroupingStore {
    fn groupings(&self, stream: &StreamKey) -> CoreResult<Vec<Grouping>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        let mut all: Vec<Grouping> = tables
            .get(stream)
            .map(|table| {
                table
                    .live()
                    .map(|(_, grouping, commit)| stamped(grouping, commit))
                    .collect()
            })
            .unwrap_or_default();
        all.sort_by(|a, b| (a.sort_order, a.id).cmp(&(b.sort_order, b.id)));
        Ok(all)
    }

    fn get(&self, stream: &StreamKey, id: EntityId) -> CoreResult<Option<Grouping>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        Ok(tables
            .get(stream)
            .and_then(|table| table.get(&id))
            .map(|(grouping, commit)| stamped(grouping, commit)))
    }

    fn changed_since(&self, stream: &StreamKey, since: CommitId) -> CoreResult<Vec<Grouping>> {
        Self::check(stream)?;
        let tables = self.tables.read();
        Ok(tables
            .get(stream)
            .map(|table| {
                table
                    .changed_since(since)
                    .into_iter()
                    .map(|(_, grouping, commit)| stamped(&grouping, commit))
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

    fn save_groupings(&self, stream: &StreamKey, groupings: &[Grouping]) -> CoreResult<CommitId> {
        Self::check(stream)?;
        let mut tables = self.tables.write();

        let changed: Vec<&Grouping> = groupings
            .iter()
            .filter(|grouping| {
                let current = tables
                    .get(stream)
                    .and_then(|table| table.get(&grouping.id));
                !matches!(current, Some((stored, _)) if stored.same_value(grouping))
            })
            .collect();

        if changed.is_empty() {
            return self.commits.head_commit(stream);
        }

        let commit = self.commits.create_commit(stream)?;
        let table = tables.entry(stream.clone()).or_default();
        for grouping in changed {
            table.put(grouping.id, stamped(grouping, commit), commit);
        }
        tracing::debug!(stream = %stream, commit = %commit, "saved grouping batch");
        Ok(commit)
    }

    fn save_grouping(&self, stream: &StreamKey, grouping: &Grouping) -> CoreResult<CommitId> {
        Self::check(stream)?;
        let mut tables = self.tables.write();
        let commit = self.commits.create_commit(stream)?;
        tables
            .entry(stream.clone())
            .or_default()
            .put(grouping.id, stamped(grouping, commit), commit);
        Ok(commit)
    }

    fn delete_grouping(&self, stream: &StreamKey, id: EntityId) -> CoreResult<CommitId> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::sync::Arc;
    use synclog_storage::InMemorySequenceStore;

    fn store() -> InMemoryGroupingStore {
        InMemoryGroupingStore::new(CommitManager::new(Arc::new(InMemorySequenceStore::new())))
    }

    fn groups() -> StreamKey {
        StreamKey::grouping("customer", "groups")
    }

    #[test]
    fn batch_shares_one_commit() {
        let store = store();
        let batch = vec![Grouping::new("VIP"), Grouping::new("Lead")];

        let commit = store.save_groupings(&groups(), &batch).unwrap();

        assert_eq!(commit, CommitId::new(1));
        let saved = store.changed_since(&groups(), CommitId::ZERO).unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|g| g.commit_id == commit));
    }

    #[test]
    fn unchanged_groupings_keep_their_commit() {
        let store = store();
        let vip = Grouping::new("VIP");
        let lead = Grouping::new("Lead");
        store
            .save_groupings(&groups(), &[vip.clone(), lead.clone()])
            .unwrap();

        let renamed = Grouping {
            name: "Prospect".into(),
            ..lead.clone()
        };
        let second = store.save_groupings(&groups(), &[vip.clone(), renamed]).unwrap();

        assert_eq!(second, CommitId::new(2));
        assert_eq!(
            store.get(&groups(), vip.id).unwrap().unwrap().commit_id,
            CommitId::new(1)
        );
        let stored_lead = store.get(&groups(), lead.id).unwrap().unwrap();
        assert_eq!(stored_lead.name, "Prospect");
        assert_eq!(stored_lead.commit_id, second);
    }

    #[test]
    fn no_op_batch_returns_head_without_commit() {
        let store = store();
        let vip = Grouping::new("VIP");
        store.save_groupings(&groups(), &[vip.clone()]).unwrap();

        assert_eq!(store.save_groupings(&groups(), &[vip]).unwrap(), CommitId::new(1));
        assert_eq!(store.save_groupings(&groups(), &[]).unwrap(), CommitId::new(1));
        assert_eq!(
            store.commits.head_commit(&groups()).unwrap(),
            CommitId::new(1)
        );
    }

    #[test]
    fn single_save_always_restamps() {
        let store = store();
        let vip = Grouping::new("VIP");
        let first = store.save_groupings(&groups(), &[vip.clone()]).unwrap();

        let second = store.save_grouping(&groups(), &vip).unwrap();

        assert!(second > first);
        assert_eq!(store.get(&groups(), vip.id).unwrap().unwrap().commit_id, second);
        assert_eq!(store.head_commit(&groups()).unwrap(), second);
    }

    #[test]
    fn delete_leaves_tombstone() {
        let store = store();
        let vip = Grouping::new("VIP");
        store.save_groupings(&groups(), &[vip.clone()]).unwrap();

        let commit = store.delete_grouping(&groups(), vip.id).unwrap();

        assert!(store.groupings(&groups()).unwrap().is_empty());
        let deleted = store.deleted_since(&groups(), CommitId::ZERO).unwrap();
        assert_eq!(deleted, vec![Tombstone { id: vip.id, commit_id: commit }]);
    }

    #[test]
    fn groupings_ordered_by_sort_order() {
        let store = store();
        let second = Grouping::new("B").with_sort_order(2);
        let first = Grouping::new("A").with_sort_order(1);
        store
            .save_groupings(&groups(), &[second.clone(), first.clone()])
            .unwrap();

        let names: Vec<_> = store
            .groupings(&groups())
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn entity_stream_is_rejected() {
        let store = store();
        let result = store.save_groupings(&StreamKey::entity("customer"), &[]);
        assert!(matches!(result, Err(CoreError::WrongStreamKind { .. })));
    }
}
