//! Configuration loading and management
//!
//! Handles parsing of `taskdeck.toml` in the data directory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::kv::validate_key;
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::task::DEFAULT_STORAGE_KEY;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "taskdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Presentation defaults
    #[serde(default)]
    pub view: ViewConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the task collection is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,

    /// How long to wait for the writer lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// View-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Filter used by `list` when none is given
    #[serde(default = "default_filter")]
    pub default_filter: String,

    /// Render the progress bar in human output
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_filter() -> String {
    Filter::All.as_str().to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_filter: default_filter(),
            show_progress: true,
        }
    }
}

impl ViewConfig {
    pub fn default_filter(&self) -> Filter {
        Filter::parse(&self.default_filter)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `taskdeck.toml` from `dir`; defaults when the file is missing.
    ///
    /// An unreadable or invalid file is an [`Error::InvalidConfig`].
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load(&config_path).map_err(|err| {
            tracing::warn!(path = %config_path.display(), error = %err, "invalid config");
            match err {
                Error::InvalidConfig(message) => Error::InvalidConfig(message),
                other => Error::InvalidConfig(format!("{}: {other}", config_path.display())),
            }
        })
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_key(&self.storage.key).map_err(|_| {
            Error::InvalidConfig(format!(
                "storage.key '{}' must use letters, digits, '-' or '_'",
                self.storage.key
            ))
        })?;
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        let filter = self.view.default_filter.trim().to_ascii_lowercase();
        if !Filter::ALL.iter().any(|known| known.as_str() == filter) {
            return Err(Error::InvalidConfig(format!(
                "view.default_filter '{filter}' (expected all|active|completed)"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.storage.key, "tasks");
        assert_eq!(cfg.storage.lock_timeout_ms, 5000);
        assert_eq!(cfg.view.default_filter(), Filter::All);
        assert!(cfg.view.show_progress);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[storage]
key = "work_tasks"
lock_timeout_ms = 250

[view]
default_filter = "active"
show_progress = false
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.storage.key, "work_tasks");
        assert_eq!(cfg.storage.lock_timeout_ms, 250);
        assert_eq!(cfg.view.default_filter(), Filter::Active);
        assert!(!cfg.view.show_progress);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[view]\ndefault_filter = \"completed\"\n").expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.storage.key, "tasks");
        assert_eq!(cfg.view.default_filter(), Filter::Completed);
        assert!(cfg.view.show_progress);
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        for content in [
            "[storage]\nkey = \"../escape\"\n",
            "[storage]\nlock_timeout_ms = 0\n",
            "[view]\ndefault_filter = \"someday\"\n",
        ] {
            fs::write(&path, content).expect("write config");
            match Config::load(&path) {
                Err(Error::InvalidConfig(_)) => {}
                other => panic!("unexpected result for {content:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn load_from_dir_defaults_only_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_dir(dir.path()).expect("defaults");
        assert_eq!(cfg.storage.key, "tasks");

        fs::write(dir.path().join(CONFIG_FILE), "storage = 3").expect("write config");
        assert!(matches!(
            Config::load_from_dir(dir.path()),
            Err(Error::InvalidConfig(_))
        ));

        fs::write(
            dir.path().join(CONFIG_FILE),
            "[storage]\nkey = \"work\"\nlock_timeout_ms = 0\n",
        )
        .expect("write config");
        assert!(matches!(
            Config::load_from_dir(dir.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn default_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[view]\ndefault_filter = \" Active \"\n").expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.view.default_filter(), Filter::Active);
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.view.default_filter = "active".to_string();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("key = \"tasks\""));
        assert_eq!(Config::load(&path).expect("reload").view.default_filter(), Filter::Active);
    }
}
