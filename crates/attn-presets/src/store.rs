//! Key/value storage backends.
//!
//! String keys, string (JSON) values. Stores are shared across processes with
//! no locking: the last writer wins.

use crate::error::{StorageError, StorageResult};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persistent string storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// In-memory store with an optional byte quota (keys + values).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key() != key)
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{key}: {needed} bytes > {quota}"
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Single JSON object file.
///
/// Every operation re-reads the file, so writes by other processes are seen
/// immediately. Writes go to a temp file in the same directory and are
/// renamed over the target. Reads of an unparsable file fail with
/// `Corrupted`; the first write moves it aside to `<name>.corrupt` and starts
/// from an empty object.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create the store, creating parent directories if needed.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "Opened preset storage file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StorageResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Corrupted(format!("{}: {e}", self.path.display()))
        })
    }

    /// Current entries for a read-modify-write cycle.
    fn read_for_write(&self) -> StorageResult<BTreeMap<String, String>> {
        match self.read_all() {
            Err(StorageError::Corrupted(reason)) => {
                let aside = self.corrupt_path();
                fs::rename(&self.path, &aside)?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    reason = %reason,
                    "Storage file unreadable, starting empty"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        debug!(path = %self.path.display(), entries = entries.len(), "Storage file written");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.read_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.read_for_write()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // BTreeMap keys are already sorted.
        Ok(self
            .read_all()?
            .into_keys()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        store.set("a:1", "x").unwrap();
        store.set("a:2", "y").unwrap();
        store.set("b:1", "z").unwrap();

        assert_eq!(store.get("a:1").unwrap().as_deref(), Some("x"));
        assert_eq!(store.keys_with_prefix("a:").unwrap(), vec!["a:1", "a:2"]);

        store.remove("a:1").unwrap();
        store.remove("a:1").unwrap();
        assert!(store.get("a:1").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        assert!(matches!(
            store.set("k2", "123456789"),
            Err(StorageError::QuotaExceeded(_))
        ));
        // Overwriting in place only counts the new value.
        store.set("k", "123456789").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/presets.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("attn.v1.preset:a", "{}").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("attn.v1.preset:a").unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(
            reopened.keys_with_prefix("attn.v1.").unwrap(),
            vec!["attn.v1.preset:a"]
        );
    }

    #[test]
    fn test_file_store_sees_other_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let first = JsonFileStore::open(&path).unwrap();
        let second = JsonFileStore::open(&path).unwrap();

        first.set("k", "1").unwrap();
        second.set("k", "2").unwrap();
        assert_eq!(first.get("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(store.get("k"), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn test_file_store_write_recovers_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        store.set("k", "v").unwrap();
        store.set("k2", "v2").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.keys_with_prefix("").unwrap(), vec!["k", "k2"]);
        let aside = dir.path().join("presets.json.corrupt");
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{not json");
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.keys_with_prefix("").unwrap().is_empty());
        store.remove("k").unwrap();
        assert!(!store.path().exists());
    }
}
