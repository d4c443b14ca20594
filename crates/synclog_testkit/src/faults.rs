//! Fault injection for the sequence store.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use synclog_storage::{InMemorySequenceStore, SequenceStore, StorageError, StorageResult};

/// The failure a [`FailingSequenceStore`] injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Behave like the wrapped store.
    None,
    /// Fail every call with `StorageError::Unavailable`.
    Unavailable,
    /// Fail the next `n` `next_value` calls with `StorageError::Unavailable`.
    UnavailableFor(usize),
    /// Accept `create_sequence` but keep reporting the sequence as missing.
    NeverCreated,
}

/// An in-memory sequence store that fails on demand and counts calls.
pub struct FailingSequenceStore {
    inner: InMemorySequenceStore,
    fault: Mutex<Fault>,
    next_value_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl FailingSequenceStore {
    /// Creates a store with the given fault.
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemorySequenceStore::new(),
            fault: Mutex::new(fault),
            next_value_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    /// Replaces the injected fault.
    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    /// Returns the number of `next_value` calls so far.
    pub fn next_value_calls(&self) -> usize {
        self.next_value_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of `create_sequence` calls so far.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("injected fault".into())
    }

    fn check_available(&self) -> StorageResult<()> {
        if *self.fault.lock() == Fault::Unavailable {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

impl SequenceStore for FailingSequenceStore {
    fn next_value(&self, key: &str) -> StorageResult<i64> {
        self.next_value_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut fault = self.fault.lock();
            match *fault {
                Fault::None => {}
                Fault::Unavailable => return Err(Self::unavailable()),
                Fault::UnavailableFor(remaining) => {
                    *fault = if remaining <= 1 {
                        Fault::None
                    } else {
                        Fault::UnavailableFor(remaining - 1)
                    };
                    return Err(Self::unavailable());
                }
                Fault::NeverCreated => return Err(StorageError::sequence_not_found(key)),
            }
        }
        self.inner.next_value(key)
    }

    fn create_sequence(&self, key: &str) -> StorageResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.inner.create_sequence(key)
    }

    fn head(&self, key: &str) -> StorageResult<i64> {
        self.check_available()?;
        self.inner.head(key)
    }

    fn set_head(&self, key: &str, value: i64) -> StorageResult<()> {
        self.check_available()?;
        self.inner.set_head(key, value)
    }
}
