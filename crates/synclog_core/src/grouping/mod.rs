//! Grouping model and grouping store.
//!
//! Groupings are the named buckets (categories, labels, folders) that one
//! field of an object type can reference. Every grouping field is its own
//! stream.

mod model;
mod store;

pub use model::Grouping;
pub use store::{GroupingStore, InMemoryGroupingStore};
