//! Key-value slots for persisted state
//!
//! A [`Storage`] holds string blobs under string keys, the way a browser's
//! local storage would. [`FileStorage`] keeps one `{key}.json` file per key;
//! [`MemoryStorage`] keeps everything in a shared map.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A key-value slot store
pub trait Storage: Send + Sync {
    /// Read the blob stored under `key`, `None` when absent
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the blob stored under `key`
    fn write(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove the blob stored under `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Storage writing one JSON file per key into a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory storage; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with one slot
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.lock().insert(key.into(), value.into());
        storage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current blob under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
