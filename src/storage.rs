//! File-backed key-value store
//!
//! Each key is one pretty-printed JSON document inside the data directory.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   taskdeck.toml        # Configuration (optional)
//!   tasks.json           # Value stored under the "tasks" key
//!   tasks.lock           # Writer lock for the key
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::kv::{validate_key, KeyValueStore, StoredValue};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKDECK_DIR";

/// Resolve the data directory: explicit path, then the platform default
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    ProjectDirs::from("", "", "taskdeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed(format!(
                "cannot determine a data directory; pass --dir or set {DATA_DIR_ENV}"
            ))
        })
}

/// Directory-scoped JSON document store
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    /// Store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path of the document holding `key`
    pub fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.lock"))
    }

    /// Create the data directory
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<StoredValue> {
        validate_key(key)?;
        let path = self.value_path(key);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(StoredValue::Absent);
            }
            Err(err) => return Err(Error::Io(err)),
        };
        match serde_json::from_slice(&content) {
            Ok(value) => Ok(StoredValue::Present(value)),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "stored value is not JSON");
                Ok(StoredValue::Corrupt(err.to_string()))
            }
        }
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let json = serde_json::to_string_pretty(value)?;
        let _lock = FileLock::acquire(self.lock_path(key), self.lock_timeout_ms)?;
        lock::write_atomic(self.value_path(key), json.as_bytes())?;
        tracing::debug!(key, bytes = json.len(), "value written");
        Ok(())
    }
}
