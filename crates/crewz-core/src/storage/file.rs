use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};

/// Storage file name in cache directory
const STORAGE_FILE: &str = "storage.json";

type Entries = BTreeMap<String, String>;

/// All entries live in one JSON object. Every write rewrites a temporary
/// sibling and renames it into place.
///
/// Reads of a corrupt file fail; the next write replaces it.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self::at_path(cache_dir.as_ref().join(STORAGE_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Entries) -> bool) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (mut entries, mut dirty) = match self.read_entries() {
            Ok(entries) => (entries, false),
            Err(StorageError::Serialization(e)) => {
                warn!(path = ?self.path, error = %e, "Storage file is corrupt, starting over");
                (Entries::new(), true)
            }
            Err(e) => return Err(e),
        };
        dirty |= f(&mut entries);
        if dirty {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read_entries()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        debug!(path = ?self.path, count = entries.len(), "Writing storage entries");
        self.modify(|current| {
            for (key, value) in entries {
                current.insert((*key).to_string(), (*value).to_string());
            }
            true
        })
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.modify(|current| {
            let mut changed = false;
            for key in keys {
                changed |= current.remove(*key).is_some();
            }
            changed
        })
    }
}
