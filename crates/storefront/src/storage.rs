//! Client-local key/value storage.
//!
//! The storefront keeps three entries in local storage: the cart identifier,
//! the serialized cart aggregate and the wishlist. Values are JSON strings and
//! there is no schema versioning: a malformed entry reads as absent, which
//! makes the caller re-create the cart or start with an empty wishlist.
//!
//! Storage handles are cheap to clone and clones share the same entries, so
//! the session and the mock backend can both hold one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage keys.
pub mod keys {
    /// Key for the current cart identifier.
    pub const CART_ID: &str = "cart_id";

    /// Key for the serialized cart aggregate.
    pub const CART: &str = "cart";

    /// Key for the serialized wishlist entries.
    pub const WISHLIST: &str = "wishlist";
}

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized.
    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A writer panicked while holding the storage lock.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A string key/value store with last-writer-wins semantics.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a raw value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value.
///
/// A value that does not parse is logged and treated as absent.
///
/// # Errors
///
/// Returns `StorageError` only if the store itself cannot be read.
pub fn read_json<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed storage entry");
            Ok(None)
        }
    }
}

/// Serialize and write a JSON value.
///
/// # Errors
///
/// Returns `StorageError` if serialization or the write fails.
pub fn write_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// Ephemeral in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Storage persisted as a single JSON object on disk.
///
/// The file is read once when opened and rewritten in full after every
/// change. Two processes sharing a file race with last-write-wins.
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<FileStorageInner>,
}

#[derive(Debug)]
struct FileStorageInner {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) a storage file.
    ///
    /// A missing file starts empty. A file that is not a JSON object of
    /// strings is logged and also starts empty; it is overwritten on the
    /// next write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Storage file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened storage file");

        Ok(Self {
            inner: Arc::new(FileStorageInner {
                path,
                entries: RwLock::new(entries),
            }),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Write the whole map to disk via a temporary file and rename.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = &self.inner.path;
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .inner
            .entries
            .read()
            .map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .inner
            .entries
            .write()
            .map_err(|_| StorageError::Poisoned)?;
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush(&entries) {
            // Keep memory in step with disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .inner
            .entries
            .write()
            .map_err(|_| StorageError::Poisoned)?;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
