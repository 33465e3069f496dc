//! Key-value stores behind the metadata cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use linkpeek_core::error::{PreviewError, Result};
use linkpeek_core::CacheStore;

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn save(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

/// Current file format version
const VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u8,
    entries: BTreeMap<String, String>,
}

/// Store persisted to a JSON file.
///
/// Every write goes through to disk (temp file, then rename), so entries
/// survive restarts of the process.
///
/// # File Format
///
/// ```text
/// { "version": 1, "entries": { "<key>": "<value>", ... } }
/// ```
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, loading it if the file exists.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&contents)
                .map_err(|e| PreviewError::StoreError(format!("unreadable store file: {}", e)))?;
            if file.version != VERSION {
                return Err(PreviewError::StoreError(format!(
                    "store version mismatch: expected {}, got {}",
                    VERSION, file.version
                )));
            }
            info!(count = file.entries.len(), "Loaded cache store");
            file.entries
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let file = StoreFile {
            version: VERSION,
            entries: entries.clone(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &serialized)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!(count = entries.len(), "Cache store saved");
        Ok(())
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_overwrite() {
        let store = MemoryStore::new();
        store.save("k", "1".into()).unwrap();
        store.save("k", "2".into()).unwrap();

        assert_eq!(store.load("k").unwrap().as_deref(), Some("2"));
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_file_store_not_created_until_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = FileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.save("link-preview-a", "{}".into()).unwrap();
            store.save("link-preview-b", "[]".into()).unwrap();
            store.delete("link-preview-b").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load("link-preview-a").unwrap().as_deref(), Some("{}"));
        assert!(store.load("link-preview-b").unwrap().is_none());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let store = FileStore::open(&path).unwrap();
        store.save("k", "v".into()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"invalid data").unwrap();

        assert!(matches!(FileStore::open(&path), Err(PreviewError::StoreError(_))));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, br#"{"version": 9, "entries": {}}"#).unwrap();

        assert!(FileStore::open(&path).is_err());
    }
}
