//! Command-line interface for taskdeck
//!
//! This module defines the CLI structure using clap derive macros.
//! Command bodies live in the submodules.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod init;
mod task;

/// taskdeck - a local task list
///
/// Add, complete and remove tasks; the list is kept in a JSON document in
/// the data directory and survives between runs.
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKDECK_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit mutation events as JSON lines to a file, or "-" for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and a default taskdeck.toml
    Init,

    /// Add a task
    Add {
        /// Task text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle a task between active and completed
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete a task
    #[command(visible_alias = "delete")]
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// Remove every completed task
    ClearCompleted,

    /// List tasks
    #[command(visible_alias = "ls")]
    List {
        /// Which tasks to show: all, active, completed
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show counters and progress
    Stats,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = task::CommandContext {
            dir: self.dir,
            json: self.json,
            quiet: self.quiet,
            events: self.events,
        };
        match self.command {
            Commands::Init => init::run(init::InitOptions {
                dir: ctx.dir,
                json: ctx.json,
                quiet: ctx.quiet,
            }),
            Commands::Add { text } => task::run_add(ctx, text.join(" ")),
            Commands::Toggle { id } => task::run_toggle(ctx, id),
            Commands::Rm { id } => task::run_delete(ctx, id),
            Commands::ClearCompleted => task::run_clear_completed(ctx),
            Commands::List { filter } => task::run_list(ctx, filter),
            Commands::Stats => task::run_stats(ctx),
        }
    }
}
