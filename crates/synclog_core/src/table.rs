//! Current-value row table shared by the in-memory stores.
//!
//! A table keeps, per id, either a live row or a tombstone, each stamped with
//! the commit id of its last write. No history is kept.

use crate::entity::EntityId;
use crate::types::CommitId;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct RowTable<V> {
    live: BTreeMap<EntityId, (V, CommitId)>,
    tombstones: BTreeMap<EntityId, CommitId>,
}

impl<V> Default for RowTable<V> {
    fn default() -> Self {
        Self {
            live: BTreeMap::new(),
            tombstones: BTreeMap::new(),
        }
    }
}

impl<V: Clone> RowTable<V> {
    pub(crate) fn get(&self, id: &EntityId) -> Option<(&V, CommitId)> {
        self.live.get(id).map(|(value, commit)| (value, *commit))
    }

    /// Stores a live row; a previous tombstone for the id is dropped.
    pub(crate) fn put(&mut self, id: EntityId, value: V, commit: CommitId) {
        self.tombstones.remove(&id);
        self.live.insert(id, (value, commit));
    }

    /// Replaces a live row with a tombstone.
    pub(crate) fn remove(&mut self, id: EntityId, commit: CommitId) {
        self.live.remove(&id);
        self.tombstones.insert(id, commit);
    }

    pub(crate) fn live(&self) -> impl Iterator<Item = (&EntityId, &V, CommitId)> {
        self.live.iter().map(|(id, (value, commit))| (id, value, *commit))
    }

    /// Live rows with a commit id above `since`, ordered by (commit, id).
    pub(crate) fn changed_since(&self, since: CommitId) -> Vec<(EntityId, V, CommitId)> {
        let mut rows: Vec<_> = self
            .live
            .iter()
            .filter(|(_, (_, commit))| *commit > since)
            .map(|(id, (value, commit))| (*id, value.clone(), *commit))
            .collect();
        rows.sort_by(|a, b| (a.2, a.0).cmp(&(b.2, b.0)));
        rows
    }

    /// Tombstones with a commit id above `since`, ordered by (commit, id).
    pub(crate) fn deleted_since(&self, since: CommitId) -> Vec<(EntityId, CommitId)> {
        let mut rows: Vec<_> = self
            .tombstones
            .iter()
            .filter(|(_, commit)| **commit > since)
            .map(|(id, commit)| (*id, *commit))
            .collect();
        rows.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        rows
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> EntityId {
        EntityId::from_bytes([byte; 16])
    }

    #[test]
    fn put_then_remove_leaves_only_tombstone() {
        let mut table = RowTable::default();
        table.put(id(1), "a", CommitId::new(1));
        table.remove(id(1), CommitId::new(2));

        assert!(table.get(&id(1)).is_none());
        assert!(table.changed_since(CommitId::ZERO).is_empty());
        assert_eq!(table.deleted_since(CommitId::ZERO), vec![(id(1), CommitId::new(2))]);
    }

    #[test]
    fn put_after_remove_clears_tombstone() {
        let mut table = RowTable::default();
        table.put(id(1), "a", CommitId::new(1));
        table.remove(id(1), CommitId::new(2));
        table.put(id(1), "b", CommitId::new(3));

        assert!(table.deleted_since(CommitId::ZERO).is_empty());
        assert_eq!(table.get(&id(1)), Some((&"b", CommitId::new(3))));
    }

    #[test]
    fn changed_since_orders_by_commit_then_id() {
        let mut table = RowTable::default();
        table.put(id(3), "c", CommitId::new(2));
        table.put(id(2), "b", CommitId::new(2));
        table.put(id(1), "a", CommitId::new(4));

        let order: Vec<_> = table
            .changed_since(CommitId::new(1))
            .into_iter()
            .map(|(id, _, commit)| (id, commit))
            .collect();
        assert_eq!(
            order,
            vec![
                (id(2), CommitId::new(2)),
                (id(3), CommitId::new(2)),
                (id(1), CommitId::new(4)),
            ]
        );
        assert_eq!(table.changed_since(CommitId::new(2)).len(), 1);
    }
}
