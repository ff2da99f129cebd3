//! Common test utilities for Quicktext integration tests
//!
//! [`TestWorkspace`] owns a temporary directory with a configuration file whose
//! store and template library point inside that directory, so the binary never
//! touches the user's real configuration.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assert_cmd::Command;
use tempfile::TempDir;

/// Compose context shared by the command-line tests.
pub const COMPOSE_CONTEXT: &str = r#"
[details]
to = ["Ada Lovelace <ada@example.com>", "charles@example.com"]
subject = "Analytical engine"
identity_id = "id1"
is_plain_text = true

[[identities]]
id = "id1"
email = "grace@example.com"
name = "Grace Hopper"

[[contacts]]
properties = { PrimaryEmail = "charles@example.com", FirstName = "Charles", LastName = "Babbage" }
"#;

/// Template library shared by the command-line tests.
pub const TEMPLATE_LIBRARY: &str = r#"
[[groups]]
name = "Replies"

[[groups.texts]]
name = "thanks"
kind = "text"
body = "Thanks for [[SUBJECT]], [[TO=firstname| and ]]."

[[groups.texts]]
name = "signature"
body = "-- [[FROM=displayname]]"
"#;

/// A temporary directory with a private configuration.
pub struct TestWorkspace {
    pub temp_dir: TempDir,
}

impl TestWorkspace {
    /// Create a workspace whose configuration points the store and the
    /// template library into the temporary directory.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let workspace = Self {
            temp_dir,
        };

        let config = format!(
            "templates = {:?}\nstore = {:?}\n\n[url]\ndebug = false\n",
            workspace.path("templates.toml"),
            workspace.path("store.json"),
        );
        workspace.write("config.toml", &config)?;
        workspace.write("templates.toml", TEMPLATE_LIBRARY)?;
        workspace.write("compose.toml", COMPOSE_CONTEXT)?;
        Ok(workspace)
    }

    /// Absolute path of `name` inside the workspace.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Path of the private configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.path("config.toml")
    }

    /// Write `content` to `name` and return its path.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Read `name` from the workspace.
    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// The binary with `--config` pointing at the private configuration.
    pub fn command(&self) -> Command {
        self.command_with_config(&self.config_path())
    }

    /// The binary with `--config` pointing at `config`.
    pub fn command_with_config(&self, config: &Path) -> Command {
        let mut cmd = Command::cargo_bin("quicktext").unwrap();
        cmd.env_remove("QUICKTEXT_CONFIG_PATH")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(config)
            .current_dir(self.temp_dir.path());
        cmd
    }
}
