//! Storage providers - the single persistence capability of an app.
//!
//! One provider is injected per [`App`](crate::engine::App). State containers
//! with a persist key write their whole snapshot through it; domain code can
//! use it directly.
//!
//! - [`MemoryStorage`] - in-process map, insertion ordered
//! - [`JsonFileStorage`] - one pretty-printed JSON file per key

use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::error::StorageError;
use crate::types::Value;

/// Key-value persistence capability.
///
/// Calls are synchronous so a persisted write can be ordered before listener
/// notification. There is no merging: `put` replaces the stored value.
pub trait StorageProvider {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;
    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;
    fn list(&self) -> Result<Vec<String>, StorageError>;
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process storage.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: RefCell<IndexMap<String, Value>>,
    available: Cell<bool>,
    writes: Cell<usize>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            entries: RefCell::new(IndexMap::new()),
            available: Cell::new(true),
            writes: Cell::new(0),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Number of successful `put` calls.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.available.get() {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory storage offline".into()))
        }
    }
}

impl StorageProvider for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check()?;
        self.entries.borrow_mut().insert(key.to_string(), value);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.check()?;
        Ok(self.entries.borrow_mut().shift_remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        self.check()?;
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

// =============================================================================
// JSON File Storage
// =============================================================================

const FILE_EXTENSION: &str = "json";

/// Directory-backed storage: `<dir>/<url-encoded key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Open (and create if needed) a storage directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.dir.join(format!("{encoded}.{FILE_EXTENSION}"))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        form_urlencoded::parse(stem.as_bytes())
            .next()
            .map(|(key, _)| key.into_owned())
    }
}

impl StorageProvider for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&value)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(key) = Self::key_for(&path) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
