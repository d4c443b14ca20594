//! # synclog storage
//!
//! Sequence/head store backends for synclog.
//!
//! This crate is the lowest layer of the commit log. A store keeps, per
//! logical stream, a monotonic counter and a durable head value. Stores are
//! **opaque**: stream keys arrive as already-encoded strings and the store
//! never interprets them.
//!
//! ## Design Principles
//!
//! - The counter increment is the single source of ordering truth; stores
//!   must make it atomic (fetch-and-increment or a serializable transaction)
//! - Heads only move forward
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemorySequenceStore`] - For testing and ephemeral state
//! - [`FileSequenceStore`] - Durable snapshot file guarded by an advisory lock
//!
//! ## Example
//!
//! ```rust
//! use synclog_storage::{InMemorySequenceStore, SequenceStore};
//!
//! let store = InMemorySequenceStore::new();
//! store.create_sequence("entity:customer").unwrap();
//! let value = store.next_value("entity:customer").unwrap();
//! store.set_head("entity:customer", value).unwrap();
//! assert_eq!(store.head("entity:customer").unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod sequence;

pub use error::{StorageError, StorageResult};
pub use file::FileSequenceStore;
pub use memory::InMemorySequenceStore;
pub use sequence::{SequenceStore, StreamState};
