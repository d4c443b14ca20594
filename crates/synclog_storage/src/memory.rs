//! In-memory sequence store for testing.

use crate::error::{StorageError, StorageResult};
use crate::sequence::{SequenceStore, StreamState};
use parking_lot::Mutex;
use std::collections::HashMap;

/// An in-memory sequence store.
///
/// All streams live in one mutex-guarded map, which makes `next_value` an
/// atomic fetch-and-increment. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral deployments that do not need durable heads
///
/// # Example
///
/// ```rust
/// use synclog_storage::{InMemorySequenceStore, SequenceStore};
///
/// let store = InMemorySequenceStore::new();
/// assert!(store.next_value("named:inbox").is_err());
/// store.create_sequence("named:inbox").unwrap();
/// assert_eq!(store.next_value("named:inbox").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    streams: Mutex<HashMap<String, StreamState>>,
}

impl InMemorySequenceStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing stream state.
    ///
    /// Useful for testing recovery and stale-cursor scenarios.
    #[must_use]
    pub fn with_streams(streams: impl IntoIterator<Item = (String, StreamState)>) -> Self {
        Self {
            streams: Mutex::new(streams.into_iter().collect()),
        }
    }

    /// Returns a copy of the state of one stream.
    #[must_use]
    pub fn stream(&self, key: &str) -> Option<StreamState> {
        self.streams.lock().get(key).copied()
    }

    /// Returns the number of streams with a counter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    /// Returns true if no counter has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.lock().is_empty()
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn next_value(&self, key: &str) -> StorageResult<i64> {
        let mut streams = self.streams.lock();
        match streams.get_mut(key) {
            Some(state) => Ok(state.advance()),
            None => Err(StorageError::sequence_not_found(key)),
        }
    }

    fn create_sequence(&self, key: &str) -> StorageResult<()> {
        self.streams.lock().entry(key.to_string()).or_default();
        Ok(())
    }

    fn head(&self, key: &str) -> StorageResult<i64> {
        Ok(self.streams.lock().get(key).map_or(0, |state| state.head))
    }

    fn set_head(&self, key: &str, value: i64) -> StorageResult<()> {
        self.streams
            .lock()
            .entry(key.to_string())
            .or_default()
            .publish(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemorySequenceStore::new();
        assert!(store.is_empty());
        assert_eq!(store.head("entity:a").unwrap(), 0);
    }

    #[test]
    fn memory_missing_sequence_fails() {
        let store = InMemorySequenceStore::new();
        let result = store.next_value("entity:a");
        assert!(matches!(result, Err(StorageError::SequenceNotFound { .. })));
    }

    #[test]
    fn memory_create_is_idempotent() {
        let store = InMemorySequenceStore::new();
        store.create_sequence("entity:a").unwrap();
        assert_eq!(store.next_value("entity:a").unwrap(), 1);

        store.create_sequence("entity:a").unwrap();
        assert_eq!(store.next_value("entity:a").unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_streams_are_independent() {
        let store = InMemorySequenceStore::new();
        store.create_sequence("entity:a").unwrap();
        store.create_sequence("entity:b").unwrap();

        assert_eq!(store.next_value("entity:a").unwrap(), 1);
        assert_eq!(store.next_value("entity:a").unwrap(), 2);
        assert_eq!(store.next_value("entity:b").unwrap(), 1);
    }

    #[test]
    fn memory_head_never_decreases() {
        let store = InMemorySequenceStore::new();
        store.set_head("entity:a", 7).unwrap();
        store.set_head("entity:a", 4).unwrap();
        assert_eq!(store.head("entity:a").unwrap(), 7);
    }

    #[test]
    fn memory_with_streams() {
        let store = InMemorySequenceStore::with_streams([(
            "entity:a".to_string(),
            StreamState {
                last_value: 3,
                head: 3,
            },
        )]);
        assert_eq!(store.head("entity:a").unwrap(), 3);
        assert_eq!(store.next_value("entity:a").unwrap(), 4);
    }

    #[test]
    fn memory_concurrent_next_value_is_unique() {
        let store = Arc::new(InMemorySequenceStore::new());
        store.create_sequence("entity:a").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| store.next_value("entity:a").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut values: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 800);
        assert_eq!(values.last().copied(), Some(800));
    }
}
