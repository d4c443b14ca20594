//! Concurrent commit stress helpers.
//!
//! These helpers drive many writers against one stream and report what
//! was issued, so tests can check uniqueness and export completeness under
//! contention.

use crate::fixtures::{drain, SyncHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use synclog_core::{CommitId, CommitManager, EntityId, EntityStore, StreamKey};
use synclog_sync::Change;

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of writer threads.
    pub threads: usize,
    /// Writes per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            ops_per_thread: 200,
        }
    }
}

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(total_ops: usize, duration: Duration) -> Self {
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total_ops as f64 / duration.as_secs_f64()
        } else {
            0.0
        };
        Self {
            total_ops,
            duration,
            ops_per_second,
        }
    }
}

/// Allocates commits on one stream from many threads at once.
///
/// Returns every issued commit id, in no particular order.
pub fn concurrent_commits(
    commits: &CommitManager,
    stream: &StreamKey,
    config: &StressConfig,
) -> (Vec<CommitId>, StressTestResult) {
    let start = Instant::now();
    let issued: Vec<CommitId> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|_| {
                scope.spawn(|| {
                    (0..config.ops_per_thread)
                        .map(|_| commits.create_commit(stream).expect("Commit failed"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("Writer panicked"))
            .collect()
    });
    let result = StressTestResult::new(issued.len(), start.elapsed());
    (issued, result)
}

/// What a concurrent writers-plus-exporter run observed.
#[derive(Debug, Clone)]
pub struct ExportRace {
    /// Final commit of every entity written.
    pub written: HashMap<EntityId, CommitId>,
    /// Every change exported, in export order.
    pub exported: Vec<Change>,
    /// Number of export cycles the exporter completed.
    pub cycles: usize,
}

/// Runs writers that save fresh entities while one partner keeps exporting
/// and confirming, then drains what is left.
pub fn concurrent_saves_with_exporter(
    harness: &SyncHarness,
    stream: &StreamKey,
    config: &StressConfig,
) -> ExportRace {
    let partner = harness
        .create_partner("stress-exporter", "stress")
        .expect("Failed to create partner");
    let collection = partner
        .collection(stream.clone())
        .expect("Failed to bind collection");
    let done = AtomicBool::new(false);

    let (written, mut exported, mut cycles) = thread::scope(|scope| {
        let exporter = scope.spawn(|| {
            let mut exported = Vec::new();
            let mut cycles = 0;
            while !done.load(Ordering::Acquire) {
                let batch = collection.export_pending().expect("Export failed");
                exported.extend(batch.changes);
                collection
                    .confirm_exported(batch.new_head)
                    .expect("Confirm failed");
                cycles += 1;
            }
            (exported, cycles)
        });

        let writers: Vec<_> = (0..config.threads)
            .map(|_| {
                scope.spawn(|| {
                    (0..config.ops_per_thread)
                        .map(|i| {
                            let id = EntityId::new();
                            let commit = harness
                                .entities
                                .save(stream, id, i.to_le_bytes().to_vec())
                                .expect("Save failed");
                            (id, commit)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let written: HashMap<EntityId, CommitId> = writers
            .into_iter()
            .flat_map(|handle| handle.join().expect("Writer panicked"))
            .collect();
        done.store(true, Ordering::Release);
        let (exported, cycles) = exporter.join().expect("Exporter panicked");
        (written, exported, cycles)
    });

    exported.extend(drain(&collection));
    cycles += 1;

    ExportRace {
        written,
        exported,
        cycles,
    }
}
