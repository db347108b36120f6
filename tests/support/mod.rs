#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated data directory for driving the `todo` binary.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `todo` pointed at this directory, ignoring the caller's environment
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("todo").expect("binary");
        cmd.env_remove("TODO_DIR")
            .env_remove("RUST_LOG")
            .arg("--dir")
            .arg(self.path());
        cmd
    }

    /// Run a command with `--json` that must succeed and return its envelope
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

    /// Add a task and return its id
    pub fn add(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let value = self.json(&full);
        value["data"]["id"].as_str().expect("task id").to_string()
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.path().join(format!("{key}.json"))
    }

    /// Parsed contents of a stored record, if present
    pub fn read_record(&self, key: &str) -> Option<Value> {
        let raw = fs::read_to_string(self.record_path(key)).ok()?;
        Some(serde_json::from_str(&raw).expect("record json"))
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("write file");
        path
    }
}
