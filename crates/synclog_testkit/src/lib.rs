//! # synclog testkit
//!
//! Test utilities for synclog.
//!
//! This crate provides:
//! - A harness wiring in-memory stores into a `SyncService`
//! - File-backed sequence store fixtures with reopen support
//! - A fault-injecting sequence store
//! - Property-based test generators using proptest
//! - Concurrent commit stress helpers
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust
//! use synclog_testkit::prelude::*;
//!
//! with_harness(|harness| {
//!     let stream = StreamKey::entity("customer");
//!     harness.save(&stream, b"Acme".to_vec());
//!     let partner = harness.create_partner("phone", "user-1").unwrap();
//!     let changes = drain(&partner.collection(stream).unwrap());
//!     assert_eq!(changes.len(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
    pub use synclog_core::{
        CommitId, CommitManager, EntityId, EntityStore, Grouping, GroupingStore, StreamKey,
    };
    pub use synclog_sync::{
        Change, ChangeAction, Collection, ExportBatch, ImportedChange, RemoteItem, SyncConfig,
        SyncError,
    };
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use stress::*;
