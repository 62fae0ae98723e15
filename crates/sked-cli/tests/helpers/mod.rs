use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sked").expect("Failed to find sked binary");

        // Keep a stray sked.toml from leaking in
        cmd.current_dir(self.temp_dir.path());
        cmd.env("SKED_DATABASE_PATH", &self.db_path);
        cmd.env("SKED_OWNER", "tester");
        cmd.env("SKED_TIMEZONE", "UTC");
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs with `--json` and parses stdout
    pub fn run_json(&self, args: &[&str]) -> Value {
        let output = self
            .command()
            .arg("--json")
            .args(args)
            .output()
            .expect("Failed to run sked");
        assert!(
            output.status.success(),
            "sked {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }

    /// Adds a schedule and returns its full ID
    pub fn add(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let created = self.run_json(&full);
        created["id"].as_str().expect("schedule has an id").to_string()
    }

    /// Occurrence starts of every listed schedule, per schedule ID
    pub fn list_starts(&self, from: &str, to: &str) -> Vec<(String, Vec<String>)> {
        let listed = self.run_json(&["list", "--from", from, "--to", to]);
        listed
            .as_array()
            .expect("list output is an array")
            .iter()
            .map(|item| {
                let starts = item["dates"]
                    .as_array()
                    .expect("dates array")
                    .iter()
                    .map(|slot| slot["start"].as_str().unwrap_or_default().to_string())
                    .collect();
                (item["id"].as_str().unwrap_or_default().to_string(), starts)
            })
            .collect()
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use super::*;

    pub fn schedule_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Created"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
