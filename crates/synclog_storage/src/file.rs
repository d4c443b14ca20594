//! File-backed sequence store for durable heads.
//!
//! Layout of the store directory:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process ownership
//! └─ SEQUENCES         # CBOR snapshot of every stream counter and head
//! ```

use crate::error::{StorageError, StorageResult};
use crate::sequence::{SequenceStore, StreamState};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const SNAPSHOT_FILE: &str = "SEQUENCES";
/// Temporary file for atomic snapshot writes.
const SNAPSHOT_TEMP: &str = "SEQUENCES.tmp";
const SNAPSHOT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u16,
    streams: Vec<(String, StreamState)>,
}

/// A sequence store persisted to a directory on disk.
///
/// Every mutation rewrites a snapshot of all streams using the
/// write-then-rename pattern, so a crash leaves either the old or the new
/// snapshot, never a torn one. A value handed out by `next_value` is durable
/// before it is returned, so a restarted process never reissues it.
///
/// # Thread Safety
///
/// A single mutex serializes all mutations, which makes `next_value` an
/// atomic fetch-and-increment within the process. The `LOCK` file prevents a
/// second process from opening the same directory.
///
/// # Example
///
/// ```no_run
/// use synclog_storage::{FileSequenceStore, SequenceStore};
/// use std::path::Path;
///
/// let store = FileSequenceStore::open(Path::new("sync-state")).unwrap();
/// store.create_sequence("entity:customer").unwrap();
/// let value = store.next_value("entity:customer").unwrap();
/// store.set_head("entity:customer", value).unwrap();
/// ```
#[derive(Debug)]
pub struct FileSequenceStore {
    path: PathBuf,
    streams: Mutex<HashMap<String, StreamState>>,
    _lock_file: File,
}

impl FileSequenceStore {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - Another process holds the lock (returns `Locked`)
    /// - The snapshot exists but cannot be decoded (returns `Corrupted`)
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let streams = Self::load_snapshot(path)?;
        tracing::debug!(path = %path.display(), streams = streams.len(), "opened sequence store");

        Ok(Self {
            path: path.to_path_buf(),
            streams: Mutex::new(streams),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_snapshot(path: &Path) -> StorageResult<HashMap<String, StreamState>> {
        let snapshot_path = path.join(SNAPSHOT_FILE);
        if !snapshot_path.exists() {
            return Ok(HashMap::new());
        }

        let data = fs::read(&snapshot_path)?;
        if data.is_empty() {
            return Ok(HashMap::new());
        }

        let snapshot: Snapshot = ciborium::from_reader(data.as_slice())
            .map_err(|e| StorageError::Corrupted(format!("invalid snapshot: {e}")))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::Corrupted(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        Ok(snapshot.streams.into_iter().collect())
    }

    /// Writes the snapshot atomically.
    fn persist(&self, streams: &HashMap<String, StreamState>) -> StorageResult<()> {
        let mut entries: Vec<(String, StreamState)> =
            streams.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            streams: entries,
        };

        let mut data = Vec::new();
        ciborium::into_writer(&snapshot, &mut data)
            .map_err(|e| StorageError::Corrupted(format!("cannot encode snapshot: {e}")))?;

        let temp_path = self.path.join(SNAPSHOT_TEMP);
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.path.join(SNAPSHOT_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Applies `f` to a copy of the stream state and commits it only if the
    /// snapshot write succeeds.
    fn mutate<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<StreamState>) -> StorageResult<(StreamState, T)>,
    ) -> StorageResult<T> {
        let mut streams = self.streams.lock();
        let (state, out) = f(streams.get(key).copied())?;
        if streams.get(key) == Some(&state) {
            return Ok(out);
        }

        let previous = streams.insert(key.to_string(), state);
        if let Err(err) = self.persist(&streams) {
            match previous {
                Some(prev) => streams.insert(key.to_string(), prev),
                None => streams.remove(key),
            };
            return Err(err);
        }
        Ok(out)
    }
}

impl SequenceStore for FileSequenceStore {
    fn next_value(&self, key: &str) -> StorageResult<i64> {
        self.mutate(key, |state| {
            let mut state = state.ok_or_else(|| StorageError::sequence_not_found(key))?;
            let value = state.advance();
            Ok((state, value))
        })
    }

    fn create_sequence(&self, key: &str) -> StorageResult<()> {
        self.mutate(key, |state| Ok((state.unwrap_or_default(), ())))
    }

    fn head(&self, key: &str) -> StorageResult<i64> {
        Ok(self.streams.lock().get(key).map_or(0, |state| state.head))
    }

    fn set_head(&self, key: &str, value: i64) -> StorageResult<()> {
        self.mutate(key, |state| {
            let mut state = state.unwrap_or_default();
            state.publish(value);
            Ok((state, ()))
        })
    }
}
