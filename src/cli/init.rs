//! taskdeck init command implementation
//!
//! Creates the data directory and a default `taskdeck.toml`.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::{resolve_data_dir, FileStore};

pub struct InitOptions {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct InitReport {
    dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let dir = resolve_data_dir(options.dir.as_deref())?;

    let created_dir = !dir.exists();
    FileStore::new(&dir).init()?;
    let created_config = ensure_config(&dir)?;

    let mut created_items = Vec::new();
    if created_dir {
        created_items.push(format!("{}/", dir.display()));
    }
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }

    let header = if created_items.is_empty() {
        "taskdeck init: nothing to do"
    } else {
        "taskdeck init: initialized"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("dir", dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("taskdeck add <text>");
    human.push_next_step("taskdeck list");

    let report = InitReport {
        dir,
        created: InitCreated {
            data_dir: created_dir,
            config: created_config,
        },
    };

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "init",
        &report,
        Some(&human),
    )
}

fn ensure_config(dir: &Path) -> Result<bool> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    tracing::debug!(path = %config_path.display(), "wrote default config");
    Ok(true)
}
