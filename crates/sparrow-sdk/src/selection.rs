//! Persisted asset selection
//!
//! The last selected asset survives restarts as a single string value under
//! the `selectedAsset` key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use sparrow_core::{AssetKind, SELECTED_ASSET_KEY};
use tracing::{debug, warn};

use crate::error::SdkResult;

/// Client-local string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> SdkResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> SdkResult<()>;
}

/// JSON object on disk
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SdkResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> SdkResult<Option<String>> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> SdkResult<()> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> SdkResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SdkResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the selected asset
#[derive(Clone)]
pub struct AssetSelection {
    store: Arc<dyn KeyValueStore>,
    fallback: AssetKind,
}

impl AssetSelection {
    pub fn new(store: Arc<dyn KeyValueStore>, fallback: AssetKind) -> Self {
        Self { store, fallback }
    }

    /// Persisted asset, or the fallback when missing or unreadable
    pub fn load(&self) -> AssetKind {
        match self.store.get(SELECTED_ASSET_KEY) {
            Ok(Some(value)) => value.parse().unwrap_or_else(|_| {
                warn!("Ignoring unknown persisted asset {:?}", value);
                self.fallback
            }),
            Ok(None) => self.fallback,
            Err(e) => {
                warn!("Failed to read persisted asset: {}", e);
                self.fallback
            }
        }
    }

    pub fn save(&self, kind: AssetKind) -> SdkResult<()> {
        debug!("Persisting selected asset {}", kind);
        self.store.set(SELECTED_ASSET_KEY, kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_falls_back() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let selection = AssetSelection::new(store.clone(), AssetKind::Avax);
        assert_eq!(selection.load(), AssetKind::Avax);

        store.set(SELECTED_ASSET_KEY, "dogecoin").unwrap();
        assert_eq!(selection.load(), AssetKind::Avax);

        selection.save(AssetKind::Beam).unwrap();
        assert_eq!(store.get(SELECTED_ASSET_KEY).unwrap().as_deref(), Some("beam"));
        assert_eq!(selection.load(), AssetKind::Beam);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("selection.json");

        let store = FileKeyValueStore::new(&path);
        assert_eq!(store.get(SELECTED_ASSET_KEY).unwrap(), None);
        store.set(SELECTED_ASSET_KEY, "beam").unwrap();
        store.set("theme", "dark").unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(reopened.get(SELECTED_ASSET_KEY).unwrap().as_deref(), Some("beam"));
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
