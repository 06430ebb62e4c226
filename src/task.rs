//! Task collection and the store that owns it.
//!
//! The whole collection lives under one key of a [`KeyValueStore`] as a JSON
//! array. Every mutation rewrites that array before returning; a failed write
//! rolls the in-memory change back so memory and storage never disagree.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::error::{Error, Result};
use crate::filter::{self, DerivedView, Filter};
use crate::kv::{validate_key, KeyValueStore, StoredValue};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// How the collection was obtained when the store opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Nothing stored yet
    Fresh,
    /// A valid collection was read
    Restored { tasks: usize },
    /// Stored data was unusable and an empty collection replaced it
    Recovered { reason: String },
}

/// Result of matching user input against task ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    Ambiguous(Vec<String>),
    Missing,
}

impl Resolution {
    /// Collapse into the id to act on; `Missing` yields `None`.
    pub fn into_id(self, input: &str) -> Result<Option<String>> {
        match self {
            Resolution::Found(id) => Ok(Some(id)),
            Resolution::Missing => Ok(None),
            Resolution::Ambiguous(candidates) => Err(Error::AmbiguousId {
                input: input.to_string(),
                candidates,
            }),
        }
    }
}

/// Owner of the task collection, writing through to `S` on every change
pub struct TaskStore<S: KeyValueStore> {
    backend: S,
    key: String,
    tasks: Vec<Task>,
    ids: Generator,
    version: u64,
    load_outcome: LoadOutcome,
}

impl<S: KeyValueStore + std::fmt::Debug> std::fmt::Debug for TaskStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("backend", &self.backend)
            .field("key", &self.key)
            .field("tasks", &self.tasks)
            .field("version", &self.version)
            .field("load_outcome", &self.load_outcome)
            .finish()
    }
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Open the collection stored under [`DEFAULT_STORAGE_KEY`]
    pub fn open(backend: S) -> Result<Self> {
        Self::open_with_key(backend, DEFAULT_STORAGE_KEY)
    }

    /// Open the collection stored under `key`.
    ///
    /// Missing or unusable data yields an empty collection; only an invalid
    /// key or a failing backend read is an error.
    pub fn open_with_key(backend: S, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        let (tasks, load_outcome) = match backend.read(&key)? {
            StoredValue::Absent => (Vec::new(), LoadOutcome::Fresh),
            StoredValue::Corrupt(reason) => (Vec::new(), LoadOutcome::Recovered { reason }),
            StoredValue::Present(value) => match decode_collection(value) {
                Ok(tasks) => {
                    let count = tasks.len();
                    (tasks, LoadOutcome::Restored { tasks: count })
                }
                Err(reason) => (Vec::new(), LoadOutcome::Recovered { reason }),
            },
        };

        match &load_outcome {
            LoadOutcome::Recovered { reason } => {
                tracing::warn!(key = %key, %reason, "stored tasks unusable; starting empty");
            }
            outcome => {
                tracing::debug!(key = %key, tasks = tasks.len(), ?outcome, "tasks loaded");
            }
        }

        Ok(Self {
            backend,
            key,
            tasks,
            ids: Generator::new(),
            version: 0,
            load_outcome,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Bumped once per committed mutation; usable as a cache key
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Filtered view and counters of the current collection
    pub fn view(&self, filter: Filter) -> DerivedView<'_> {
        filter::derive_view(&self.tasks, filter)
    }

    /// Append a task. Whitespace-only text is ignored and returns `None`.
    pub fn add_task(&mut self, text: &str) -> Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring empty task text");
            return Ok(None);
        }

        let task = Task {
            id: self.next_id(),
            text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        self.tasks.push(task.clone());
        if let Err(err) = self.persist() {
            self.tasks.pop();
            return Err(err);
        }
        tracing::debug!(id = %task.id, "task added");
        Ok(Some(task))
    }

    /// Flip completion of the task with `id`; `None` when no such task.
    pub fn toggle_task(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let completed = {
            let task = &mut self.tasks[index];
            task.completed = !task.completed;
            task.completed
        };
        if let Err(err) = self.persist() {
            self.tasks[index].completed = !completed;
            return Err(err);
        }
        tracing::debug!(id, completed, "task toggled");
        Ok(Some(completed))
    }

    /// Remove the task with `id`, keeping the order of the rest.
    pub fn delete_task(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let removed = self.tasks.remove(index);
        if let Err(err) = self.persist() {
            self.tasks.insert(index, removed);
            return Err(err);
        }
        tracing::debug!(id, "task deleted");
        Ok(Some(removed))
    }

    /// Drop every completed task; returns how many were removed.
    ///
    /// Nothing is written when no task is completed.
    pub fn clear_completed(&mut self) -> Result<usize> {
        if !self.tasks.iter().any(|task| task.completed) {
            return Ok(0);
        }

        let previous = self.tasks.clone();
        self.tasks.retain(|task| !task.completed);
        let removed = previous.len() - self.tasks.len();
        if let Err(err) = self.persist() {
            self.tasks = previous;
            return Err(err);
        }
        tracing::debug!(removed, "completed tasks cleared");
        Ok(removed)
    }

    /// Match `input` against ids: exact first, then a unique prefix
    /// (case-insensitive).
    pub fn resolve_id(&self, input: &str) -> Resolution {
        let input = input.trim();
        if input.is_empty() {
            return Resolution::Missing;
        }
        if self.get(input).is_some() {
            return Resolution::Found(input.to_string());
        }

        let needle = input.to_ascii_lowercase();
        let mut matches: Vec<String> = self
            .tasks
            .iter()
            .filter(|task| task.id.to_ascii_lowercase().starts_with(&needle))
            .map(|task| task.id.clone())
            .collect();

        match matches.len() {
            0 => Resolution::Missing,
            1 => Resolution::Found(matches.remove(0)),
            _ => Resolution::Ambiguous(matches),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn next_id(&mut self) -> String {
        loop {
            let ulid = self.ids.generate().unwrap_or_else(|_| Ulid::new());
            let id = ulid.to_string().to_lowercase();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) -> Result<()> {
        let value = serde_json::to_value(&self.tasks)?;
        self.backend.write(&self.key, &value)?;
        self.version += 1;
        Ok(())
    }
}

/// Decode and validate a stored collection; `Err` carries the reason it was
/// rejected.
fn decode_collection(value: serde_json::Value) -> std::result::Result<Vec<Task>, String> {
    let tasks: Vec<Task> = serde_json::from_value(value).map_err(|err| err.to_string())?;

    let mut seen = HashSet::new();
    for task in &tasks {
        if task.text.trim().is_empty() {
            return Err(format!("task {} has empty text", task.id));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(format!("duplicate task id {}", task.id));
        }
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use serde_json::{json, Value};

    /// Backend whose writes can be switched off to simulate a full disk.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn read(&self, key: &str) -> Result<StoredValue> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &Value) -> Result<()> {
            if self.fail_writes {
                return Err(Error::OperationFailed("disk full".to_string()));
            }
            self.inner.write(key, value)
        }
    }

    fn stored_tasks(store: &TaskStore<MemoryStore>) -> Vec<Task> {
        let value = store.backend().read(store.storage_key()).unwrap();
        serde_json::from_value(value.into_value().unwrap()).unwrap()
    }

    #[test]
    fn add_trims_and_appends() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let task = store.add_task("  buy milk ").unwrap().expect("created");

        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(store.tasks(), &[task]);
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn blank_text_is_ignored_without_write() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        assert!(store.add_task("").unwrap().is_none());
        assert!(store.add_task(" \t\n ").unwrap().is_none());
        assert!(store.is_empty());
        assert_eq!(store.backend().write_count(), 0);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn ids_are_unique_back_to_back() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        for n in 0..500 {
            store.add_task(&format!("task {n}")).unwrap();
        }
        let ids: HashSet<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn toggle_flips_only_the_target() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        let b = store.add_task("b").unwrap().unwrap();

        assert_eq!(store.toggle_task(&a.id).unwrap(), Some(true));
        assert!(store.get(&a.id).unwrap().completed);
        assert_eq!(store.get(&b.id).unwrap(), &b);
        assert_eq!(store.get(&a.id).unwrap().created_at, a.created_at);

        assert_eq!(store.toggle_task(&a.id).unwrap(), Some(false));
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn unknown_ids_change_nothing() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        store.add_task("a").unwrap();
        let before = store.tasks().to_vec();
        let writes = store.backend().write_count();

        assert_eq!(store.toggle_task("nonexistent").unwrap(), None);
        assert_eq!(store.delete_task("nonexistent").unwrap(), None);

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn delete_keeps_order() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        store.add_task("A").unwrap();
        let b = store.add_task("B").unwrap().unwrap();
        store.add_task("C").unwrap();

        let removed = store.delete_task(&b.id).unwrap().expect("removed");
        assert_eq!(removed.text, "B");

        let texts: Vec<&str> = store.tasks().iter().map(|task| task.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "C"]);
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn clear_completed_is_idempotent() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        store.add_task("b").unwrap();
        let c = store.add_task("c").unwrap().unwrap();
        store.toggle_task(&a.id).unwrap();
        store.toggle_task(&c.id).unwrap();

        assert_eq!(store.clear_completed().unwrap(), 2);
        let once = store.tasks().to_vec();
        let writes = store.backend().write_count();

        assert_eq!(store.clear_completed().unwrap(), 0);
        assert_eq!(store.tasks(), once.as_slice());
        assert_eq!(store.backend().write_count(), writes);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].text, "b");
    }

    #[test]
    fn reopen_restores_collection() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        store.add_task("b").unwrap();
        store.toggle_task(&a.id).unwrap();
        let expected = store.tasks().to_vec();

        let reopened = TaskStore::open(store.into_backend()).unwrap();
        assert_eq!(reopened.tasks(), expected.as_slice());
        assert_eq!(reopened.load_outcome(), &LoadOutcome::Restored { tasks: 2 });
    }

    #[test]
    fn fresh_and_corrupt_are_distinguished() {
        let fresh = TaskStore::open(MemoryStore::new()).unwrap();
        assert_eq!(fresh.load_outcome(), &LoadOutcome::Fresh);

        let mut backend = MemoryStore::new();
        backend.insert_raw("tasks", "[{\"id\":");
        let recovered = TaskStore::open(backend).unwrap();
        assert!(recovered.is_empty());
        assert!(matches!(recovered.load_outcome(), LoadOutcome::Recovered { .. }));
    }

    #[test]
    fn wrong_shape_recovers_empty() {
        for bad in [
            json!({ "tasks": [] }),
            json!([{ "id": "1", "text": "x" }]),
            json!([{ "id": "1", "text": "  ", "completed": false, "createdAt": "2026-01-01T00:00:00Z" }]),
            json!([
                { "id": "1", "text": "x", "completed": false, "createdAt": "2026-01-01T00:00:00Z" },
                { "id": "1", "text": "y", "completed": true, "createdAt": "2026-01-01T00:00:00Z" }
            ]),
        ] {
            let mut backend = MemoryStore::new();
            backend.write("tasks", &bad).unwrap();
            let store = TaskStore::open(backend).unwrap();
            assert!(store.is_empty(), "{bad}");
            assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
        }
    }

    #[test]
    fn persisted_format_uses_camel_case() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        store.add_task("buy milk").unwrap();
        let raw: Value = serde_json::from_str(store.backend().raw("tasks").unwrap()).unwrap();
        let first = &raw[0];
        assert_eq!(first["text"], "buy milk");
        assert_eq!(first["completed"], false);
        assert!(first["createdAt"].is_string());
        assert!(first["id"].is_string());
    }

    #[test]
    fn failed_write_rolls_back() {
        let mut store = TaskStore::open(FlakyStore::default()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        store.add_task("b").unwrap();
        store.toggle_task(&a.id).unwrap();
        let before = store.tasks().to_vec();
        let version = store.version();

        store.backend.fail_writes = true;
        assert!(store.add_task("c").is_err());
        assert!(store.toggle_task(&a.id).is_err());
        assert!(store.delete_task(&a.id).is_err());
        assert!(store.clear_completed().is_err());

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.version(), version);
    }

    #[test]
    fn custom_key_is_validated_and_used() {
        assert!(matches!(
            TaskStore::open_with_key(MemoryStore::new(), "bad/key"),
            Err(Error::InvalidKey(_))
        ));

        let mut store = TaskStore::open_with_key(MemoryStore::new(), "work").unwrap();
        store.add_task("x").unwrap();
        assert!(store.backend().raw("work").is_some());
        assert!(store.backend().raw("tasks").is_none());
    }

    #[test]
    fn resolve_id_by_prefix() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        let b = store.add_task("b").unwrap().unwrap();

        assert_eq!(store.resolve_id(&a.id), Resolution::Found(a.id.clone()));
        assert_eq!(
            store.resolve_id(&b.id.to_uppercase()),
            Resolution::Found(b.id.clone())
        );
        assert_eq!(store.resolve_id("zzzz"), Resolution::Missing);
        assert_eq!(store.resolve_id("  "), Resolution::Missing);

        // Ids generated in the same run share their timestamp prefix.
        let shared: String = a
            .id
            .chars()
            .zip(b.id.chars())
            .take_while(|(x, y)| x == y)
            .map(|(x, _)| x)
            .collect();
        if !shared.is_empty() {
            assert!(matches!(store.resolve_id(&shared), Resolution::Ambiguous(_)));
        }
    }

    #[test]
    fn ambiguous_resolution_is_an_error() {
        let resolution = Resolution::Ambiguous(vec!["ab1".to_string(), "ab2".to_string()]);
        let err = resolution.into_id("ab").unwrap_err();
        assert!(matches!(err, Error::AmbiguousId { .. }));
        assert_eq!(Resolution::Missing.into_id("x").unwrap(), None);
    }

    #[test]
    fn version_counts_commits() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        let a = store.add_task("a").unwrap().unwrap();
        store.toggle_task(&a.id).unwrap();
        store.toggle_task("missing").unwrap();
        store.clear_completed().unwrap();
        assert_eq!(store.version(), 3);
    }
}
