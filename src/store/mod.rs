//! Persistent key-value storage and the two stores built on it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │    AlarmStore    │   │  CountdownStore  │
//! └────────┬─────────┘   └────────┬─────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────────────────────────────┐
//! │      KeyValueStore (get/put/clear)      │
//! ├────────────────────┬────────────────────┤
//! │     FileStore      │    MemoryStore     │
//! │  <dir>/<key>.json  │   (tests/mocks)    │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! Both stores serialize a versioned JSON envelope under a fixed key and
//! degrade to empty/default state when the stored bytes cannot be parsed.

pub mod alarms;
pub mod countdown;
mod error;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use alarms::AlarmStore;
pub use countdown::CountdownStore;
pub use error::StoreError;

/// Schema version written into every persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted wrapper adding the schema version next to the body fields.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    #[serde(flatten)]
    body: T,
}

/// Encodes `body` inside a versioned envelope and writes it under `key`.
fn write_versioned<T: Serialize>(
    backend: &dyn KeyValueStore,
    key: &str,
    body: &T,
) -> Result<(), StoreError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        body,
    };
    let bytes =
        serde_json::to_vec_pretty(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))?;
    backend.put(key, &bytes)
}

/// Reads a versioned envelope from `key`.
///
/// Missing, unreadable, malformed and newer-than-supported values all yield
/// `None`; all but the first are logged.
fn read_versioned<T: DeserializeOwned>(backend: &dyn KeyValueStore, key: &str) -> Option<T> {
    let bytes = match backend.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", key, e);
            return None;
        }
    };

    match serde_json::from_slice::<Envelope<T>>(&bytes) {
        Ok(envelope) if envelope.version > SCHEMA_VERSION => {
            warn!(
                "Ignoring {} written by a newer version (schema {}, supported {})",
                key, envelope.version, SCHEMA_VERSION
            );
            None
        }
        Ok(envelope) => Some(envelope.body),
        Err(e) => {
            warn!("Discarding malformed {}: {}", key, e);
            None
        }
    }
}

/// Byte-oriented key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removes every stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// FileStore
// ============================================================================

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling file first and are renamed into place,
/// so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryCreation` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::DirectoryCreation(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailed(format!("{}: {}", path.display(), e))),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));

        fs::write(&tmp_path, value)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {}", path.display(), e)))?;

        debug!("Persisted {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| StoreError::ReadFailed(format!("{}: {}", self.dir.display(), e)))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .map_err(|e| StoreError::WriteFailed(format!("{}: {}", path.display(), e)))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    should_fail: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `put` fail, as a full disk would.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(format!("{key}: mock failure")));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
