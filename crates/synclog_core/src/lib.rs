//! # synclog core
//!
//! Commit log core for synclog.
//!
//! This crate provides:
//! - Typed commit ids and stream keys
//! - The `CommitManager`, the single source of ordering truth per stream
//! - Entity and grouping store interfaces that stamp every write with a
//!   fresh commit id, plus in-memory implementations
//!
//! ## Key Invariants
//!
//! - Commit ids within a stream are strictly increasing and never reused
//! - The head of a stream is at least every commit id issued in it
//! - Deletes mint a commit id too, stamped on a tombstone
//! - Only current values are kept; there is no commit history

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod config;
mod entity;
mod error;
mod grouping;
mod table;
mod types;

pub use commit::CommitManager;
pub use config::CommitConfig;
pub use entity::{EntityId, EntityRow, EntityStore, InMemoryEntityStore, Tombstone};
pub use error::{CoreError, CoreResult};
pub use grouping::{Grouping, GroupingStore, InMemoryGroupingStore};
pub use types::{CommitId, StreamKey, StreamKind};

pub use synclog_storage::{SequenceStore, StorageError};
