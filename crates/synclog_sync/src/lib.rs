//! # synclog sync
//!
//! Incremental, cursor-based synchronization of commit streams with remote
//! partners.
//!
//! A [`Partner`] owns one cursor per bound stream. A [`Collection`] diffs a
//! stream against that cursor and hands out an [`ExportBatch`]; the cursor
//! only moves once the partner confirms receipt, so a lost batch is simply
//! exported again (at-least-once delivery).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use synclog_core::{CommitManager, EntityId, EntityStore, InMemoryEntityStore,
//!     InMemoryGroupingStore, StreamKey};
//! use synclog_storage::InMemorySequenceStore;
//! use synclog_sync::{InMemoryPartnerStore, SyncService};
//!
//! let commits = CommitManager::new(Arc::new(InMemorySequenceStore::new()));
//! let entities = Arc::new(InMemoryEntityStore::new(commits.clone()));
//! let groupings = Arc::new(InMemoryGroupingStore::new(commits.clone()));
//! let service = SyncService::new(
//!     commits,
//!     entities.clone(),
//!     groupings,
//!     Arc::new(InMemoryPartnerStore::new()),
//! );
//!
//! let customers = StreamKey::entity("customer");
//! entities.save(&customers, EntityId::new(), b"Acme".to_vec()).unwrap();
//!
//! let partner = service.create_partner("phone-1", "user-1").unwrap();
//! let collection = partner.collection(customers).unwrap();
//! let batch = collection.export_pending().unwrap();
//! assert_eq!(batch.changes.len(), 1);
//! collection.confirm_exported(batch.new_head).unwrap();
//! assert!(!collection.is_behind_head().unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod collection;
mod config;
mod error;
mod partner;
mod service;
mod store;

pub use change::{Change, ChangeAction, ExportBatch, ImportStat, ImportedChange, RemoteItem};
pub use collection::{Collection, CollectionState};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use partner::{Partner, PartnerId};
pub use service::SyncService;
pub use store::{CursorState, ImportRecord, InMemoryPartnerStore, PartnerRecord, PartnerStore};
