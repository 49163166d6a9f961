//! # Halo Storage
//!
//! Snapshot persistence for the ledger state.
//!
//! ## Storage Layout
//!
//! - `state_db` - in-memory snapshots keyed by name
//! - `file_db` - one `<key>.bin` file per snapshot under a data directory
//!
//! Snapshots are bincode-encoded.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Invalid snapshot key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Named snapshot persistence
pub trait SnapshotStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous snapshot
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;

    /// Load the snapshot under `key`, if any
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    fn contains(&self, key: &str) -> bool;
}

fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

pub mod state_db {
    //! In-memory snapshot storage

    use super::{check_key, Result, SnapshotStore};
    use parking_lot::RwLock;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::collections::HashMap;

    /// Snapshots held in memory
    pub struct StateStore {
        snapshots: RwLock<HashMap<String, Vec<u8>>>,
    }

    impl StateStore {
        pub fn new() -> Self {
            Self {
                snapshots: RwLock::new(HashMap::new()),
            }
        }

        pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
            self.snapshots.write().insert(key.to_string(), bytes);
        }

        pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
            self.snapshots.read().get(key).cloned()
        }

        pub fn delete(&self, key: &str) -> bool {
            self.snapshots.write().remove(key).is_some()
        }

        pub fn len(&self) -> usize {
            self.snapshots.read().len()
        }

        pub fn is_empty(&self) -> bool {
            self.snapshots.read().is_empty()
        }
    }

    impl Default for StateStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SnapshotStore for StateStore {
        fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
            check_key(key)?;
            let bytes = bincode::serialize(value)?;
            self.put_raw(key, bytes);
            Ok(())
        }

        fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
            check_key(key)?;
            match self.snapshots.read().get(key) {
                Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
                None => Ok(None),
            }
        }

        fn contains(&self, key: &str) -> bool {
            self.snapshots.read().contains_key(key)
        }
    }
}

pub mod file_db {
    //! File-backed snapshot storage

    use super::{check_key, Result, SnapshotStore};
    use parking_lot::Mutex;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tracing::debug;

    /// Snapshots stored as `<data_dir>/<key>.bin`
    ///
    /// Writes go to a temporary file that is renamed over the target, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub struct FileStateStore {
        data_dir: PathBuf,
        write_lock: Mutex<()>,
    }

    impl FileStateStore {
        /// Open a store rooted at `data_dir`, creating the directory if needed
        pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
            let data_dir = data_dir.as_ref().to_path_buf();
            fs::create_dir_all(&data_dir)?;
            Ok(Self {
                data_dir,
                write_lock: Mutex::new(()),
            })
        }

        pub fn data_dir(&self) -> &Path {
            &self.data_dir
        }

        fn path_for(&self, key: &str) -> PathBuf {
            self.data_dir.join(format!("{key}.bin"))
        }
    }

    impl SnapshotStore for FileStateStore {
        fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
            check_key(key)?;
            let bytes = bincode::serialize(value)?;
            let path = self.path_for(key);
            let tmp = self.data_dir.join(format!("{key}.bin.tmp"));

            let _guard = self.write_lock.lock();
            {
                let mut file = fs::File::create(&tmp)?;
                file.write_all(&bytes)?;
                file.sync_all()?;
            }
            fs::rename(&tmp, &path)?;
            debug!(key, bytes = bytes.len(), path = %path.display(), "Snapshot saved");
            Ok(())
        }

        fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
            check_key(key)?;
            let path = self.path_for(key);
            if !path.exists() {
                return Ok(None);
            }
            let bytes = fs::read(&path)?;
            Ok(Some(bincode::deserialize(&bytes)?))
        }

        fn contains(&self, key: &str) -> bool {
            self.path_for(key).exists()
        }
    }
}

// Re-export for convenience
pub use file_db::FileStateStore;
pub use state_db::StateStore;
