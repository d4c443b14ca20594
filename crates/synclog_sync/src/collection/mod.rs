//! Collections: one partner's view of one stream.

mod diff;
mod source;

pub(crate) use source::Source;

use crate::change::{ChangeAction, ExportBatch, ImportStat, ImportedChange, RemoteItem};
use crate::error::{SyncError, SyncResult};
use crate::partner::PartnerId;
use crate::service::SyncContext;
use crate::store::{CursorState, ImportRecord};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use synclog_core::{CommitId, EntityId, StreamKey};

/// Where a collection is in its export cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// No export outstanding.
    Idle,
    /// An export is being computed.
    Exporting,
    /// A batch was handed out and its confirmation is pending.
    AwaitingAck,
}

/// Binds a partner to a stream and diffs the stream against the partner's
/// cursor.
///
/// Exports never move the cursor. The partner confirms what it stored with
/// [`confirm_exported`](Collection::confirm_exported); until then the same
/// changes are exported again.
pub struct Collection {
    partner: PartnerId,
    stream: StreamKey,
    source: Source,
    ctx: Arc<SyncContext>,
    state: Mutex<CollectionState>,
}

impl Collection {
    pub(crate) fn new(
        partner: PartnerId,
        stream: StreamKey,
        source: Source,
        ctx: Arc<SyncContext>,
    ) -> Self {
        Self {
            partner,
            stream,
            source,
            ctx,
            state: Mutex::new(CollectionState::Idle),
        }
    }

    /// Returns the partner this collection belongs to.
    pub fn partner_id(&self) -> PartnerId {
        self.partner
    }

    /// Returns the stream.
    pub fn stream(&self) -> &StreamKey {
        &self.stream
    }

    /// Returns the export cycle state.
    pub fn state(&self) -> CollectionState {
        *self.state.lock()
    }

    /// Returns the stored cursor.
    pub fn cursor(&self) -> SyncResult<CursorState> {
        Ok(self
            .ctx
            .partners
            .cursor(self.partner, &self.stream)?
            .unwrap_or_default())
    }

    /// Returns the highest commit the partner confirmed.
    pub fn last_commit_id(&self) -> SyncResult<CommitId> {
        Ok(self.cursor()?.last_commit_id)
    }

    /// Returns the current head of the stream.
    pub fn head_commit(&self) -> SyncResult<CommitId> {
        self.source.head_commit(&self.stream)
    }

    /// Exports every change with a commit id above `since`.
    ///
    /// Changes are ordered by (commit id, id); an id appears at most once,
    /// with its latest state. Confirming `new_head` afterwards is always
    /// safe: it never exceeds what the stream issued and never skips a row
    /// that is not in the batch.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::StaleCursor` if `since` is above the stream head.
    /// Storage failures are returned as-is; retry with the same `since`.
    pub fn export_changes(&self, since: CommitId) -> SyncResult<ExportBatch> {
        *self.state.lock() = CollectionState::Exporting;
        match self.diff(since) {
            Ok(batch) => {
                *self.state.lock() = CollectionState::AwaitingAck;
                tracing::debug!(
                    partner = %self.partner,
                    stream = %self.stream,
                    since = %since,
                    changes = batch.changes.len(),
                    new_head = %batch.new_head,
                    has_more = batch.has_more,
                    "exported changes"
                );
                Ok(batch)
            }
            Err(err) => {
                *self.state.lock() = CollectionState::Idle;
                Err(err)
            }
        }
    }

    /// Exports every change above the stored cursor.
    pub fn export_pending(&self) -> SyncResult<ExportBatch> {
        let since = self.last_commit_id()?;
        self.export_changes(since)
    }

    fn diff(&self, since: CommitId) -> SyncResult<ExportBatch> {
        // Read the head first. Every row at or below it is stamped by the
        // time the store reads below return; rows committed later are left
        // for the next export.
        let head = self.source.head_commit(&self.stream)?;
        if since > head {
            return Err(SyncError::StaleCursor { since, head });
        }

        let changed = self.source.changed_since(&self.stream, since)?;
        let deleted = self.source.deleted_since(&self.stream, since)?;
        let mut rows = diff::merge(changed, deleted);
        rows.retain(|change| change.commit_id <= head);

        let echoes = self.echoes(since)?;
        Ok(diff::paginate(
            rows,
            head,
            self.ctx.config.max_changes_per_export,
            |change| echoes.contains(&(change.id, change.commit_id)),
        ))
    }

    /// Rows above `since` that this partner wrote itself.
    fn echoes(&self, since: CommitId) -> SyncResult<HashSet<(EntityId, CommitId)>> {
        if !self.ctx.config.suppress_import_echo {
            return Ok(HashSet::new());
        }
        Ok(self
            .ctx
            .partners
            .imports_since(self.partner, &self.stream, since)?
            .into_iter()
            .map(|record| (record.local_id, record.local_commit))
            .collect())
    }

    /// Moves the cursor to `new_head` once the partner stored a batch.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::CursorAhead` if `new_head` is above the stream
    /// head and `SyncError::CursorRegression` if it is below the cursor.
    pub fn confirm_exported(&self, new_head: CommitId) -> SyncResult<CursorState> {
        let head = self.source.head_commit(&self.stream)?;
        if new_head > head {
            return Err(SyncError::CursorAhead {
                cursor: new_head,
                head,
            });
        }

        let cursor = self
            .ctx
            .partners
            .update_cursor(self.partner, &self.stream, &|current: CursorState| {
                if new_head < current.last_commit_id {
                    return Err(SyncError::CursorRegression {
                        cursor: current.last_commit_id,
                        requested: new_head,
                    });
                }
                Ok(advanced(current, new_head))
            })?;
        *self.state.lock() = CollectionState::Idle;

        let pruned = self.ctx.partners.prune_imports(
            self.partner,
            &self.stream,
            new_head,
            self.ctx.config.stale_scan_limit,
        )?;
        tracing::debug!(
            partner = %self.partner,
            stream = %self.stream,
            cursor = %new_head,
            pruned,
            "confirmed export"
        );
        Ok(cursor)
    }

    /// Returns true if the stream has commits the partner has not confirmed.
    pub fn is_behind_head(&self) -> SyncResult<bool> {
        let head = self.head_commit()?;
        Ok(self.last_commit_id()? < head)
    }

    /// Moves the cursor straight to the stream head without exporting.
    ///
    /// Used when a partner already holds the current state, e.g. right after
    /// an initial bulk copy.
    pub fn fast_forward_to_head(&self) -> SyncResult<CommitId> {
        let head = self.head_commit()?;
        self.ctx
            .partners
            .update_cursor(self.partner, &self.stream, &|current: CursorState| {
                Ok(advanced(current, current.last_commit_id.max(head)))
            })?;
        *self.state.lock() = CollectionState::Idle;
        tracing::debug!(partner = %self.partner, stream = %self.stream, head = %head, "fast-forwarded cursor");
        Ok(head)
    }

    /// Resets the cursor to zero so the next export carries the whole stream.
    pub fn full_resync(&self) -> SyncResult<()> {
        let previous = self.last_commit_id()?;
        self.ctx
            .partners
            .update_cursor(self.partner, &self.stream, &|current: CursorState| {
                Ok(advanced(current, CommitId::ZERO))
            })?;
        *self.state.lock() = CollectionState::Idle;
        tracing::warn!(
            partner = %self.partner,
            stream = %self.stream,
            previous = %previous,
            "full resync: cursor reset"
        );
        Ok(())
    }

    /// Applies one change received from the partner.
    ///
    /// The change is written like any local edit and mints a fresh local
    /// commit id. It is logged so later exports do not echo it back and so
    /// [`import_diff`](Collection::import_diff) knows its remote revision.
    /// Returns `None` for a delete of an object that was never imported.
    pub fn apply_imported_change(&self, change: ImportedChange) -> SyncResult<Option<ImportRecord>> {
        if change.remote_id.trim().is_empty() {
            return Err(SyncError::invalid_import("remote id must not be empty"));
        }

        let logged = self
            .ctx
            .partners
            .import_by_remote_id(self.partner, &self.stream, &change.remote_id)?
            .filter(|record| !record.deleted);
        let local_id = change.local_id.or(logged.map(|record| record.local_id));

        let record = match change.action {
            ChangeAction::Change => {
                let payload = change.payload.ok_or_else(|| {
                    SyncError::invalid_import(format!("change {} has no payload", change.remote_id))
                })?;
                let id = local_id.unwrap_or_else(EntityId::new);
                let commit = self.source.save(&self.stream, id, payload)?;
                ImportRecord {
                    remote_id: change.remote_id,
                    remote_revision: change.remote_revision,
                    local_id: id,
                    local_commit: commit,
                    deleted: false,
                }
            }
            ChangeAction::Delete => {
                let Some(id) = local_id else {
                    tracing::trace!(
                        stream = %self.stream,
                        remote_id = %change.remote_id,
                        "skipped delete of unknown import"
                    );
                    return Ok(None);
                };
                let commit = self.source.delete(&self.stream, id)?;
                ImportRecord {
                    remote_id: change.remote_id,
                    remote_revision: change.remote_revision,
                    local_id: id,
                    local_commit: commit,
                    deleted: true,
                }
            }
        };

        self.ctx
            .partners
            .log_import(self.partner, &self.stream, record.clone())?;
        tracing::trace!(
            stream = %self.stream,
            remote_id = %record.remote_id,
            local_id = %record.local_id,
            commit = %record.local_commit,
            "applied import"
        );
        Ok(Some(record))
    }

    /// Compares the partner's current listing with the import log.
    ///
    /// Returns one entry per object that must be fetched (`Change`: new, or
    /// its revision moved) or deleted locally (`Delete`: imported before but
    /// no longer listed). Objects whose revision matches the log are omitted.
    pub fn import_diff(&self, remote_items: &[RemoteItem]) -> SyncResult<Vec<ImportStat>> {
        let mut stats: Vec<Option<ImportStat>> = self
            .ctx
            .partners
            .imports(self.partner, &self.stream)?
            .into_iter()
            .filter(|record| !record.deleted)
            .map(|record| {
                Some(ImportStat {
                    remote_id: record.remote_id,
                    remote_revision: record.remote_revision,
                    local_id: Some(record.local_id),
                    action: ChangeAction::Delete,
                })
            })
            .collect();
        let mut index: HashMap<String, usize> = stats
            .iter()
            .enumerate()
            .filter_map(|(slot, stat)| stat.as_ref().map(|stat| (stat.remote_id.clone(), slot)))
            .collect();

        for item in remote_items {
            let Some(&slot) = index.get(&item.remote_id) else {
                index.insert(item.remote_id.clone(), stats.len());
                stats.push(Some(ImportStat {
                    remote_id: item.remote_id.clone(),
                    remote_revision: item.remote_revision,
                    local_id: None,
                    action: ChangeAction::Change,
                }));
                continue;
            };
            let Some(stat) = stats[slot].as_mut() else {
                continue;
            };
            if stat.remote_revision == item.remote_revision {
                stats[slot] = None;
                index.remove(&item.remote_id);
            } else {
                stat.action = ChangeAction::Change;
                stat.remote_revision = item.remote_revision;
            }
        }
        Ok(stats.into_iter().flatten().collect())
    }
}

fn advanced(current: CursorState, to: CommitId) -> CursorState {
    CursorState {
        last_commit_id: to,
        revision: current.revision + 1,
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("partner", &self.partner)
            .field("stream", &self.stream)
            .field("state", &self.state())
            .finish()
    }
}
