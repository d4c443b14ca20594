//! Change records exchanged with partners.

use serde::{Deserialize, Serialize};
use synclog_core::{CommitId, EntityId};

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    /// The row was created or updated.
    Change,
    /// The row was deleted.
    Delete,
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Local id of the row.
    pub id: EntityId,
    /// Created/updated or deleted.
    pub action: ChangeAction,
    /// Commit id stamped on the row.
    pub commit_id: CommitId,
    /// Current payload; `None` for deletes.
    pub payload: Option<Vec<u8>>,
}

impl Change {
    /// Creates a create/update record.
    pub fn changed(id: EntityId, commit_id: CommitId, payload: Vec<u8>) -> Self {
        Self {
            id,
            action: ChangeAction::Change,
            commit_id,
            payload: Some(payload),
        }
    }

    /// Creates a delete record.
    pub fn deleted(id: EntityId, commit_id: CommitId) -> Self {
        Self {
            id,
            action: ChangeAction::Delete,
            commit_id,
            payload: None,
        }
    }

    /// Returns true for delete records.
    pub fn is_delete(&self) -> bool {
        self.action == ChangeAction::Delete
    }
}

/// Result of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBatch {
    /// Changes ordered by (commit id, id).
    pub changes: Vec<Change>,
    /// Cursor to confirm once the partner has stored `changes`.
    pub new_head: CommitId,
    /// True when the batch was cut short and more changes follow `new_head`.
    pub has_more: bool,
}

impl ExportBatch {
    /// Returns true if the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A change received from a partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedChange {
    /// The partner's id for the object.
    pub remote_id: String,
    /// The partner's revision of the object.
    pub remote_revision: i64,
    /// Known local id, if the partner already has a mapping.
    pub local_id: Option<EntityId>,
    /// Created/updated or deleted on the partner.
    pub action: ChangeAction,
    /// New payload for changes.
    pub payload: Option<Vec<u8>>,
}

impl ImportedChange {
    /// Creates a create/update import.
    pub fn changed(remote_id: impl Into<String>, remote_revision: i64, payload: Vec<u8>) -> Self {
        Self {
            remote_id: remote_id.into(),
            remote_revision,
            local_id: None,
            action: ChangeAction::Change,
            payload: Some(payload),
        }
    }

    /// Creates a delete import.
    pub fn deleted(remote_id: impl Into<String>, remote_revision: i64) -> Self {
        Self {
            remote_id: remote_id.into(),
            remote_revision,
            local_id: None,
            action: ChangeAction::Delete,
            payload: None,
        }
    }

    /// Sets the known local id.
    #[must_use]
    pub fn with_local_id(mut self, local_id: EntityId) -> Self {
        self.local_id = Some(local_id);
        self
    }
}

/// An object as listed by a partner, used to work out what to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// The partner's id for the object.
    pub remote_id: String,
    /// The partner's current revision of the object.
    pub remote_revision: i64,
}

impl RemoteItem {
    /// Creates a remote item.
    pub fn new(remote_id: impl Into<String>, remote_revision: i64) -> Self {
        Self {
            remote_id: remote_id.into(),
            remote_revision,
        }
    }
}

/// One entry of an import diff: a remote object that must be fetched or
/// deleted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStat {
    /// The partner's id for the object.
    pub remote_id: String,
    /// The partner's revision to import.
    pub remote_revision: i64,
    /// Local id from a previous import, if any.
    pub local_id: Option<EntityId>,
    /// Fetch and apply (`Change`) or delete locally (`Delete`).
    pub action: ChangeAction,
}
