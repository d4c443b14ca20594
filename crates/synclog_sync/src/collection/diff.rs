//! Merging and paging of exported changes.

use crate::change::{Change, ExportBatch};
use std::collections::HashMap;
use synclog_core::{CommitId, EntityId};

/// Merges live changes and deletes into one list ordered by (commit id, id).
///
/// If an id shows up on both sides, which can happen when a write lands
/// between the two store reads, the record with the higher commit wins.
pub(crate) fn merge(changed: Vec<Change>, deleted: Vec<Change>) -> Vec<Change> {
    let mut latest: HashMap<EntityId, Change> = HashMap::with_capacity(changed.len() + deleted.len());
    for change in changed.into_iter().chain(deleted) {
        match latest.get(&change.id) {
            Some(existing) if existing.commit_id >= change.commit_id => {}
            _ => {
                latest.insert(change.id, change);
            }
        }
    }

    let mut merged: Vec<Change> = latest.into_values().collect();
    merged.sort_by(|a, b| (a.commit_id, a.id).cmp(&(b.commit_id, b.id)));
    merged
}

/// Cuts ordered changes, none above `head`, into a batch.
///
/// Rows for which `is_echo` holds are left out but still count as processed,
/// so they move `new_head` forward. With a `limit`, the batch ends at the
/// last commit that fits; rows sharing one commit id are never split, and
/// the first commit is always taken even if it alone exceeds the limit.
pub(crate) fn paginate(
    rows: Vec<Change>,
    head: CommitId,
    limit: Option<usize>,
    is_echo: impl Fn(&Change) -> bool,
) -> ExportBatch {
    let mut changes = Vec::new();
    let mut last_commit = CommitId::ZERO;
    for group in rows.chunk_by(|a, b| a.commit_id == b.commit_id) {
        let visible: Vec<&Change> = group.iter().filter(|change| !is_echo(change)).collect();
        if let Some(limit) = limit {
            if !changes.is_empty() && changes.len() + visible.len() > limit {
                return ExportBatch {
                    changes,
                    new_head: last_commit,
                    has_more: true,
                };
            }
        }
        changes.extend(visible.into_iter().cloned());
        last_commit = group[0].commit_id;
    }

    ExportBatch {
        changes,
        new_head: head,
        has_more: false,
    }
}
