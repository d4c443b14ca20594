//! Sync partners.

use crate::collection::Collection;
use crate::error::SyncResult;
use crate::service::SyncContext;
use crate::store::PartnerRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use synclog_core::StreamKey;
use uuid::Uuid;

/// Local identifier of a partner.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartnerId(Uuid);

impl PartnerId {
    /// Generates a new random partner id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PartnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartnerId({})", self.0)
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote device or account that syncs with this system.
///
/// A partner binds to any number of streams; each binding is a
/// [`Collection`] with its own cursor. Obtain partners from
/// [`SyncService`](crate::SyncService).
pub struct Partner {
    record: PartnerRecord,
    ctx: Arc<SyncContext>,
}

impl Partner {
    pub(crate) fn new(record: PartnerRecord, ctx: Arc<SyncContext>) -> Self {
        Self { record, ctx }
    }

    /// Returns the local partner id.
    pub fn id(&self) -> PartnerId {
        self.record.id
    }

    /// Returns the partner's own id.
    pub fn remote_id(&self) -> &str {
        &self.record.remote_id
    }

    /// Returns the owning user.
    pub fn owner_id(&self) -> &str {
        &self.record.owner_id
    }

    /// Returns the last completed sync as Unix milliseconds.
    pub fn last_sync(&self) -> Option<u64> {
        self.record.last_sync
    }

    /// Returns the collection for `stream`, creating its cursor at zero on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnknownStream` for a named stream with no
    /// registered store.
    pub fn collection(&self, stream: StreamKey) -> SyncResult<Collection> {
        stream.validate()?;
        let source = self.ctx.source(&stream)?;
        self.ctx.partners.ensure_cursor(self.record.id, &stream)?;
        Ok(Collection::new(
            self.record.id,
            stream,
            source,
            Arc::clone(&self.ctx),
        ))
    }

    /// Lists the streams this partner is bound to.
    pub fn collections(&self) -> SyncResult<Vec<StreamKey>> {
        self.ctx.partners.streams(self.record.id)
    }

    /// Drops the binding to `stream` with its cursor and import log.
    pub fn remove_collection(&self, stream: &StreamKey) -> SyncResult<bool> {
        let removed = self.ctx.partners.remove_cursor(self.record.id, stream)?;
        if removed {
            tracing::debug!(partner = %self.record.id, stream = %stream, "removed collection");
        }
        Ok(removed)
    }

    /// Records the current time as the last completed sync.
    pub fn touch_last_sync(&mut self) -> SyncResult<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(unix_millis)
            .unwrap_or(0);
        let mut record = self.record.clone();
        record.last_sync = Some(now);
        self.ctx.partners.update_partner(&record)?;
        self.record = record;
        Ok(())
    }
}

impl fmt::Debug for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partner")
            .field("id", &self.record.id)
            .field("remote_id", &self.record.remote_id)
            .field("owner_id", &self.record.owner_id)
            .field("last_sync", &self.record.last_sync)
            .finish()
    }
}

fn unix_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
