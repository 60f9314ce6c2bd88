//! Durable key-value storage and the single cache slot built on it.

use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs,
    path::PathBuf,
    sync::Arc,
};

use crate::{error::StoreError, model::HelloPayload};

/// String key-value storage that outlives a single view.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object on disk, one string value per key.
///
/// Every write rewrites the whole file through a sibling temp file and a rename.
/// Separate processes sharing the file are not coordinated: the last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    /// A file that no longer parses is replaced rather than blocking every later write.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(path = %self.path.display(), "Replacing corrupt store file: {}", e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

/// The one persisted copy of the last successfully fetched payload.
#[derive(Debug, Clone)]
pub struct CacheSlot {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl CacheSlot {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unreadable or corrupt contents count as an empty slot.
    pub fn read(&self) -> Option<HelloPayload> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read cache slot: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(key = %self.key, "Ignoring corrupt cache slot: {}", e);
                None
            }
        }
    }

    pub fn write(&self, payload: &HelloPayload) -> Result<(), StoreError> {
        let raw = serde_json::to_string(payload)?;
        self.store.set(&self.key, &raw)
    }
}
