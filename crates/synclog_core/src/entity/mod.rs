//! Entity identifiers and the entity store.

mod id;
mod store;

pub use id::EntityId;
pub use store::{EntityRow, EntityStore, InMemoryEntityStore, Tombstone};
