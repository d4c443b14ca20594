//! Concurrent writers against one stream.

use std::collections::{HashMap, HashSet};
use synclog_core::{CommitId, StreamKey};
use synclog_testkit::prelude::*;

#[test]
fn concurrent_commits_are_unique_and_dense() {
    init_test_logging();
    let harness = SyncHarness::new();
    let stream = StreamKey::entity("customer");
    let config = StressConfig::default();

    let (issued, result) = concurrent_commits(&harness.commits, &stream, &config);

    let total = config.threads * config.ops_per_thread;
    let unique: HashSet<_> = issued.iter().copied().collect();
    assert_eq!(unique.len(), total);
    assert_eq!(result.total_ops, total);
    let expected: HashSet<_> = (1..=total as i64).map(CommitId::new).collect();
    assert_eq!(unique, expected);
    assert_eq!(harness.head(&stream), CommitId::new(total as i64));
}

#[test]
fn concurrent_streams_do_not_interfere() {
    let harness = SyncHarness::new();
    let config = StressConfig {
        threads: 4,
        ops_per_thread: 50,
    };
    let streams = [
        StreamKey::entity("customer"),
        StreamKey::grouping("customer", "groups"),
        StreamKey::named("inbox"),
    ];

    std::thread::scope(|scope| {
        for stream in &streams {
            let commits = &harness.commits;
            let config = &config;
            scope.spawn(move || concurrent_commits(commits, stream, config));
        }
    });

    for stream in &streams {
        assert_eq!(harness.head(stream), CommitId::new(200));
    }
}

#[test]
fn exporter_racing_writers_sees_every_row() {
    init_test_logging();
    let harness = SyncHarness::new();
    let stream = StreamKey::entity("customer");
    let config = StressConfig {
        threads: 4,
        ops_per_thread: 100,
    };

    let race = concurrent_saves_with_exporter(&harness, &stream, &config);

    let exported: HashMap<_, _> = race
        .exported
        .iter()
        .map(|change| (change.id, change.commit_id))
        .collect();
    assert_eq!(race.exported.len(), race.written.len(), "row exported twice");
    assert_eq!(exported, race.written);
    assert!(race.cycles >= 1);
}
