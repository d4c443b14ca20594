//! Sequence store trait definition.

use crate::error::StorageResult;
use serde::{Deserialize, Serialize};

/// Persisted state of one stream: its counter and its head.
///
/// `last_value` is the last value handed out by the counter. `head` is the
/// last value a committer published. They only differ while a commit is in
/// flight between `next_value` and `set_head`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Last value returned by `next_value`.
    pub last_value: i64,
    /// Highest value published through `set_head`.
    pub head: i64,
}

impl StreamState {
    /// Advances the counter and returns the new value.
    pub(crate) fn advance(&mut self) -> i64 {
        self.last_value += 1;
        self.last_value
    }

    /// Publishes a head, keeping the larger of the stored and given values.
    pub(crate) fn publish(&mut self, value: i64) {
        self.head = self.head.max(value);
    }
}

/// A transactional counter plus a durable head row per logical stream.
///
/// Keys are opaque strings. The caller is responsible for building keys that
/// cannot collide between unrelated streams.
///
/// # Preconditions
///
/// Implementations must provide:
/// - An **atomic fetch-and-increment** in `next_value`: two concurrent callers
///   on the same key never observe the same value, and values are handed out
///   in strictly increasing order. Callers do not add locking of their own.
/// - A **monotonic head** in `set_head`: the stored head is the maximum of
///   every value ever published, so interleaved committers cannot move it
///   backwards.
/// - Read-after-write consistency for `head` within the same store.
///
/// # Implementors
///
/// - [`super::InMemorySequenceStore`] - For testing
/// - [`super::FileSequenceStore`] - For durable single-process state
pub trait SequenceStore: Send + Sync {
    /// Returns the next counter value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::SequenceNotFound` if the counter for `key` has
    /// never been created, or a storage error if the store is unreachable.
    fn next_value(&self, key: &str) -> StorageResult<i64>;

    /// Creates the counter for `key` if it does not exist.
    ///
    /// Creating an existing counter is a no-op, so concurrent lazy creators
    /// are safe.
    fn create_sequence(&self, key: &str) -> StorageResult<()>;

    /// Returns the head for `key`, or 0 if the stream has never committed.
    fn head(&self, key: &str) -> StorageResult<i64>;

    /// Publishes `value` as the head for `key`.
    ///
    /// A value lower than the stored head is ignored.
    fn set_head(&self, key: &str, value: i64) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn advance_is_monotonic() {
        let mut state = StreamState::default();
        assert_eq!(state.advance(), 1);
        assert_eq!(state.advance(), 2);
        assert_eq!(state.last_value, 2);
    }

    #[test]
    fn publish_keeps_maximum() {
        let mut state = StreamState::default();
        state.publish(5);
        state.publish(3);
        assert_eq!(state.head, 5);
    }

    proptest! {
        #[test]
        fn published_head_is_running_maximum(values in prop::collection::vec(0i64..10_000, 1..64)) {
            let mut state = StreamState::default();
            for value in &values {
                state.publish(*value);
            }
            prop_assert_eq!(state.head, values.iter().copied().max().unwrap_or(0));
        }
    }
}
