//! taskdeck - a persistent task list
//!
//! This library holds the task collection manager behind the `taskdeck`
//! CLI. Every mutation is written through to a key-value backend, so a
//! restarted process sees the same collection.
//!
//! # Core Concepts
//!
//! - **Tasks**: id, text, completion flag and creation time
//! - **Task store**: owns the collection and persists it after each change
//! - **Filters**: `all`, `active` and `completed` views with counters
//! - **Key-value backends**: in-memory for tests, JSON files on disk
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskdeck.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL mutation events
//! - `filter`: Filtered views and counters
//! - `kv`: Key-value store contract and the in-memory backend
//! - `lock`: File locking and atomic writes
//! - `output`: JSON envelope and human output
//! - `storage`: Data directory resolution and the file backend
//! - `task`: Task model and the write-through store

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod kv;
pub mod lock;
pub mod output;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
pub use filter::{derive_view, DerivedView, Filter, TaskStats};
pub use kv::{KeyValueStore, MemoryStore, StoredValue};
pub use storage::FileStore;
pub use task::{LoadOutcome, Resolution, Task, TaskStore};
