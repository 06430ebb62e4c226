#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Temporary data directory for one test
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file("taskdeck.toml", contents)
    }

    pub fn read_tasks(&self) -> Value {
        let content = fs::read_to_string(self.tasks_path()).expect("read tasks.json");
        serde_json::from_str(&content).expect("tasks.json is json")
    }

    /// `taskdeck` pointed at this directory
    pub fn cmd(&self) -> Command {
        let mut cmd = taskdeck_cmd();
        cmd.env("TASKDECK_DIR", self.path());
        cmd
    }

    /// Run with `--json` and parse the envelope; the command must succeed.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    pub fn add(&self, text: &str) -> String {
        let value = self.json(&["add", text]);
        value["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}

pub fn taskdeck_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskdeck").expect("taskdeck binary");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("TASKDECK_DIR");
    cmd
}
