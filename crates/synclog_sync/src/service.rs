//! Sync service entry point.

use crate::collection::Source;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::partner::{Partner, PartnerId};
use crate::store::{PartnerRecord, PartnerStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use synclog_core::{CommitManager, EntityStore, GroupingStore, StreamKey};

/// Dependencies shared by the service, its partners and their collections.
pub(crate) struct SyncContext {
    pub(crate) commits: CommitManager,
    pub(crate) entities: Arc<dyn EntityStore>,
    pub(crate) groupings: Arc<dyn GroupingStore>,
    pub(crate) named: RwLock<HashMap<String, Arc<dyn EntityStore>>>,
    pub(crate) partners: Arc<dyn PartnerStore>,
    pub(crate) config: SyncConfig,
}

impl SyncContext {
    /// Resolves the store that backs `stream`.
    pub(crate) fn source(&self, stream: &StreamKey) -> SyncResult<Source> {
        match stream {
            StreamKey::Entity { .. } => Ok(Source::Rows(Arc::clone(&self.entities))),
            StreamKey::Grouping { .. } => Ok(Source::Groupings(Arc::clone(&self.groupings))),
            StreamKey::Named { name } => self
                .named
                .read()
                .get(name)
                .map(|store| Source::Rows(Arc::clone(store)))
                .ok_or_else(|| SyncError::UnknownStream(name.clone())),
        }
    }
}

/// Entry point for partner management.
///
/// All collaborators are passed in explicitly; the service holds no global
/// state and several independent services may coexist in one process.
pub struct SyncService {
    ctx: Arc<SyncContext>,
}

impl SyncService {
    /// Creates a service with the default configuration.
    pub fn new(
        commits: CommitManager,
        entities: Arc<dyn EntityStore>,
        groupings: Arc<dyn GroupingStore>,
        partners: Arc<dyn PartnerStore>,
    ) -> Self {
        Self::with_config(commits, entities, groupings, partners, SyncConfig::default())
    }

    /// Creates a service with an explicit configuration.
    pub fn with_config(
        commits: CommitManager,
        entities: Arc<dyn EntityStore>,
        groupings: Arc<dyn GroupingStore>,
        partners: Arc<dyn PartnerStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(SyncContext {
                commits,
                entities,
                groupings,
                named: RwLock::new(HashMap::new()),
                partners,
                config,
            }),
        }
    }

    /// Returns the commit manager.
    pub fn commits(&self) -> &CommitManager {
        &self.ctx.commits
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    /// Registers the store backing the named stream `name`, replacing any
    /// earlier registration.
    ///
    /// The store may stamp its rows from its own commit manager. Collections
    /// on the stream read the head from the store, never from the service's
    /// commit manager.
    pub fn register_named_store(
        &self,
        name: impl Into<String>,
        store: Arc<dyn EntityStore>,
    ) -> SyncResult<()> {
        let name = name.into();
        StreamKey::named(name.as_str()).validate()?;
        self.ctx.named.write().insert(name, store);
        Ok(())
    }

    /// Creates a partner.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PartnerExists` if `remote_id` is already registered.
    pub fn create_partner(
        &self,
        remote_id: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> SyncResult<Partner> {
        let record = PartnerRecord {
            id: PartnerId::new(),
            remote_id: remote_id.into(),
            owner_id: owner_id.into(),
            last_sync: None,
        };
        self.ctx.partners.insert_partner(record.clone())?;
        tracing::debug!(partner = %record.id, remote_id = %record.remote_id, "created partner");
        Ok(Partner::new(record, Arc::clone(&self.ctx)))
    }

    /// Loads a partner by its remote id.
    pub fn partner(&self, remote_id: &str) -> SyncResult<Partner> {
        self.ctx
            .partners
            .partner(remote_id)?
            .map(|record| Partner::new(record, Arc::clone(&self.ctx)))
            .ok_or_else(|| SyncError::PartnerNotFound(remote_id.to_string()))
    }

    /// Deletes a partner with all its cursors and import logs.
    pub fn delete_partner(&self, remote_id: &str) -> SyncResult<()> {
        let record = self
            .ctx
            .partners
            .partner(remote_id)?
            .ok_or_else(|| SyncError::PartnerNotFound(remote_id.to_string()))?;
        self.ctx.partners.delete_partner(record.id)?;
        tracing::debug!(partner = %record.id, remote_id, "deleted partner");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPartnerStore;
    use synclog_core::{InMemoryEntityStore, InMemoryGroupingStore};
    use synclog_storage::InMemorySequenceStore;

    fn service() -> SyncService {
        let commits = CommitManager::new(Arc::new(InMemorySequenceStore::new()));
        SyncService::new(
            commits.clone(),
            Arc::new(InMemoryEntityStore::new(commits.clone())),
            Arc::new(InMemoryGroupingStore::new(commits)),
            Arc::new(InMemoryPartnerStore::new()),
        )
    }

    #[test]
    fn create_and_load_partner() {
        let service = service();
        let created = service.create_partner("phone", "user-1").unwrap();
        let loaded = service.partner("phone").unwrap();
        assert_eq!(created.id(), loaded.id());
        assert_eq!(loaded.owner_id(), "user-1");
    }

    #[test]
    fn duplicate_partner_rejected() {
        let service = service();
        service.create_partner("phone", "user-1").unwrap();
        assert!(matches!(
            service.create_partner("phone", "user-2"),
            Err(SyncError::PartnerExists(_))
        ));
    }

    #[test]
    fn delete_missing_partner() {
        let service = service();
        assert!(matches!(
            service.delete_partner("nobody"),
            Err(SyncError::PartnerNotFound(_))
        ));
    }

    #[test]
    fn delete_partner_then_lookup_fails() {
        let service = service();
        service.create_partner("phone", "user-1").unwrap();
        service.delete_partner("phone").unwrap();
        assert!(matches!(
            service.partner("phone"),
            Err(SyncError::PartnerNotFound(_))
        ));
    }

    #[test]
    fn unknown_named_stream() {
        let service = service();
        let partner = service.create_partner("phone", "user-1").unwrap();
        let result = partner.collection(StreamKey::named("inbox"));
        assert!(matches!(result, Err(SyncError::UnknownStream(name)) if name == "inbox"));
    }

    #[test]
    fn registered_named_stream_resolves() {
        let service = service();
        let inbox = Arc::new(InMemoryEntityStore::new(service.commits().clone()));
        service.register_named_store("inbox", inbox).unwrap();

        let partner = service.create_partner("phone", "user-1").unwrap();
        assert!(partner.collection(StreamKey::named("inbox")).is_ok());
    }

    #[test]
    fn empty_named_stream_rejected() {
        let service = service();
        let store = Arc::new(InMemoryEntityStore::new(service.commits().clone()));
        assert!(service.register_named_store(" ", store).is_err());
    }
}
