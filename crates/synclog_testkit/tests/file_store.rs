//! Durable sequence store behavior across reopen.

use std::sync::Arc;
use synclog_core::{CommitId, CommitManager, StreamKey};
use synclog_storage::{FileSequenceStore, StorageError};
use synclog_sync::SyncConfig;
use synclog_testkit::prelude::*;

#[test]
fn commits_continue_after_reopen() {
    init_test_logging();
    let mut temp = TempSequenceStore::new();
    let customers = StreamKey::entity("customer");
    let groups = StreamKey::grouping("customer", "groups");

    {
        let commits = CommitManager::new(temp.store());
        for _ in 0..3 {
            commits.create_commit(&customers).unwrap();
        }
        commits.create_commit(&groups).unwrap();
    }

    let commits = CommitManager::new(temp.reopen());
    assert_eq!(commits.head_commit(&customers).unwrap(), CommitId::new(3));
    assert_eq!(commits.head_commit(&groups).unwrap(), CommitId::new(1));
    assert_eq!(commits.create_commit(&customers).unwrap(), CommitId::new(4));
}

#[test]
fn second_open_is_locked() {
    let temp = TempSequenceStore::new();
    let _held = temp.store();

    let result = FileSequenceStore::open(temp.path());
    assert!(matches!(result, Err(StorageError::Locked)));
}

#[test]
fn harness_over_file_store() {
    init_test_logging();
    let temp = TempSequenceStore::new();
    let harness = SyncHarness::with_sequences(temp.store(), SyncConfig::default());
    let customers = StreamKey::entity("customer");
    harness.save(&customers, b"Acme".to_vec());

    let partner = harness.create_partner("phone", "user-1").unwrap();
    let changes = drain(&partner.collection(customers.clone()).unwrap());
    assert_eq!(changes.len(), 1);
    assert_eq!(harness.head(&customers), CommitId::new(1));
    drop(harness);

    let store: Arc<FileSequenceStore> = temp.store();
    assert_eq!(
        CommitManager::new(store).head_commit(&customers).unwrap(),
        CommitId::new(1)
    );
}
