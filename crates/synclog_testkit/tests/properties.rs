//! Property tests for commit ordering and export correctness.

use proptest::prelude::*;
use std::collections::HashMap;
use synclog_core::{CommitId, EntityId, EntityStore, StreamKey};
use synclog_sync::{ChangeAction, SyncConfig};
use synclog_testkit::prelude::*;

const SLOTS: usize = 6;

fn customers() -> StreamKey {
    StreamKey::entity("customer")
}

/// Final (action, commit) per slot after applying `ops`.
fn apply(harness: &SyncHarness, ids: &[EntityId], ops: &[WriteOp]) -> HashMap<EntityId, (ChangeAction, CommitId)> {
    let mut expected = HashMap::new();
    for op in ops {
        let id = ids[op.slot()];
        match op {
            WriteOp::Save { payload, .. } => {
                let commit = harness.entities.save(&customers(), id, payload.clone()).unwrap();
                expected.insert(id, (ChangeAction::Change, commit));
            }
            WriteOp::Delete { .. } => {
                let commit = harness.entities.delete(&customers(), id).unwrap();
                expected.insert(id, (ChangeAction::Delete, commit));
            }
        }
    }
    expected
}

fn slot_ids() -> Vec<EntityId> {
    (0..SLOTS).map(|_| EntityId::new()).collect()
}

proptest! {
    #[test]
    fn commits_strictly_increase(streams in prop::collection::vec(stream_key_strategy(), 1..40)) {
        let harness = SyncHarness::new();
        let mut last: HashMap<String, CommitId> = HashMap::new();

        for stream in &streams {
            let commit = harness.commits.create_commit(stream).unwrap();
            let previous = last.insert(stream.storage_key(), commit).unwrap_or(CommitId::ZERO);
            prop_assert!(commit > previous);
            prop_assert_eq!(harness.head(stream), commit);
        }
    }

    #[test]
    fn export_is_idempotent(ops in write_ops_strategy(SLOTS, 30), pick in any::<prop::sample::Index>()) {
        let harness = SyncHarness::new();
        let ids = slot_ids();
        apply(&harness, &ids, &ops);

        let head = harness.head(&customers()).as_i64();
        let since = CommitId::new(pick.index(head as usize + 1) as i64);
        let partner = harness.create_partner("phone", "user-1").unwrap();
        let collection = partner.collection(customers()).unwrap();

        let first = collection.export_changes(since).unwrap();
        let second = collection.export_changes(since).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn export_is_complete(ops in write_ops_strategy(SLOTS, 30), pick in any::<prop::sample::Index>()) {
        let harness = SyncHarness::new();
        let ids = slot_ids();
        let expected = apply(&harness, &ids, &ops);

        let head = harness.head(&customers());
        let since = CommitId::new(pick.index(head.as_i64() as usize + 1) as i64);
        let partner = harness.create_partner("phone", "user-1").unwrap();
        let batch = partner
            .collection(customers())
            .unwrap()
            .export_changes(since)
            .unwrap();

        let mut exported = HashMap::new();
        for change in &batch.changes {
            prop_assert!(change.commit_id > since);
            let duplicate = exported.insert(change.id, (change.action, change.commit_id));
            prop_assert!(duplicate.is_none(), "id exported twice");
        }
        let wanted: HashMap<_, _> = expected
            .into_iter()
            .filter(|(_, (_, commit))| *commit > since)
            .collect();
        prop_assert_eq!(exported, wanted);
        prop_assert_eq!(batch.new_head, head);
        prop_assert!(batch
            .changes
            .windows(2)
            .all(|pair| (pair[0].commit_id, pair[0].id) < (pair[1].commit_id, pair[1].id)));
    }

    #[test]
    fn paged_export_matches_unpaged(ops in write_ops_strategy(SLOTS, 30), limit in 1usize..5) {
        let paged = SyncHarness::with_config(SyncConfig::new().with_max_changes_per_export(limit));
        let ids = slot_ids();
        apply(&paged, &ids, &ops);

        let partner = paged.create_partner("phone", "user-1").unwrap();
        let collection = partner.collection(customers()).unwrap();
        let unpaged = collection.export_changes(CommitId::ZERO).unwrap();
        prop_assert!(unpaged.changes.len() <= limit || unpaged.has_more);

        let drained = drain(&collection);
        let mut ids_seen: Vec<_> = drained.iter().map(|c| c.id).collect();
        ids_seen.sort();
        ids_seen.dedup();
        prop_assert_eq!(ids_seen.len(), drained.len());
        prop_assert_eq!(collection.last_commit_id().unwrap(), paged.head(&customers()));
        prop_assert!(drained.windows(2).all(|pair| pair[0].commit_id < pair[1].commit_id));
    }

    #[test]
    fn cursor_never_exceeds_head(
        ops in write_ops_strategy(SLOTS, 20),
        confirms in prop::collection::vec(0i64..40, 1..20),
    ) {
        let harness = SyncHarness::new();
        let ids = slot_ids();
        let partner = harness.create_partner("phone", "user-1").unwrap();
        let collection = partner.collection(customers()).unwrap();

        for (i, value) in confirms.iter().enumerate() {
            if let Some(op) = ops.get(i) {
                apply(&harness, &ids, std::slice::from_ref(op));
            }
            let before = collection.last_commit_id().unwrap();
            let result = collection.confirm_exported(CommitId::new(*value));
            let after = collection.last_commit_id().unwrap();

            prop_assert!(after <= harness.head(&customers()));
            prop_assert!(after >= before);
            if result.is_err() {
                prop_assert_eq!(after, before);
            }
        }
    }
}

#[test]
fn drained_changes_match_final_state() {
    let harness = SyncHarness::new();
    let ids = slot_ids();
    let ops = vec![
        WriteOp::Save { slot: 0, payload: vec![1] },
        WriteOp::Save { slot: 1, payload: vec![2] },
        WriteOp::Delete { slot: 0 },
        WriteOp::Save { slot: 1, payload: vec![3] },
    ];
    let expected = apply(&harness, &ids, &ops);

    let partner = harness.create_partner("phone", "user-1").unwrap();
    let drained = drain(&partner.collection(customers()).unwrap());
    let exported: HashMap<_, _> = drained
        .iter()
        .map(|c| (c.id, (c.action, c.commit_id)))
        .collect();
    assert_eq!(exported, expected);
}
