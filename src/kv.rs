//! Durable key-value store contract
//!
//! The task store persists through this trait and treats the medium as a
//! black box: string keys, JSON values, whole-value reads and writes.
//! A read distinguishes a missing key from a value that exists but could not
//! be decoded, so callers can tell a first run from lost data.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Outcome of reading a key
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Nothing has been written under the key
    Absent,
    /// Something is stored but it is not valid JSON
    Corrupt(String),
    Present(Value),
}

impl StoredValue {
    /// The decoded value, if any
    pub fn into_value(self) -> Option<Value> {
        match self {
            StoredValue::Present(value) => Some(value),
            StoredValue::Absent | StoredValue::Corrupt(_) => None,
        }
    }
}

/// Persistent medium addressed by string key, storing JSON values
///
/// Implementations must return [`StoredValue::Absent`] for keys never
/// written and must round-trip every value passed to `write`.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<StoredValue>;

    fn write(&mut self, key: &str, value: &Value) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn read(&self, key: &str) -> Result<StoredValue> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).write(key, value)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn read(&self, key: &str) -> Result<StoredValue> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).write(key, value)
    }
}

/// Storage keys are used as file stems by the file backend, so they are
/// restricted to `[A-Za-z0-9_-]+`.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}

/// Volatile in-process store
///
/// Values are kept as raw strings so a test can plant undecodable data with
/// [`MemoryStore::insert_raw`] the same way a damaged file would look.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text under `key` without JSON validation
    pub fn insert_raw(&mut self, key: impl Into<String>, raw: impl Into<String>) {
        self.entries.insert(key.into(), raw.into());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of successful `write` calls
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<StoredValue> {
        let Some(raw) = self.entries.get(key) else {
            return Ok(StoredValue::Absent);
        };
        match serde_json::from_str(raw) {
            Ok(value) => Ok(StoredValue::Present(value)),
            Err(err) => Ok(StoredValue::Corrupt(err.to_string())),
        }
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let raw = serde_json::to_string(value)?;
        self.entries.insert(key.to_string(), raw);
        self.writes += 1;
        Ok(())
    }
}
