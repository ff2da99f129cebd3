//! Global configuration for Quicktext.
//!
//! The configuration file holds user-wide settings: where the template library
//! and the durable store live, how dates are formatted, and how `URL` and
//! `SCRIPT` directives behave.
//!
//! # Configuration File Location
//!
//! - **Override**: the `QUICKTEXT_CONFIG_PATH` environment variable
//! - **Linux**: `~/.config/quicktext/config.toml`
//! - **macOS**: `~/Library/Application Support/quicktext/config.toml`
//! - **Windows**: `%APPDATA%\quicktext\config.toml`
//!
//! A missing file is not an error; every setting has a default.
//!
//! # File Format
//!
//! ```toml
//! debug = false
//! templates = "~/.config/quicktext/templates.toml"
//! store = "~/.local/share/quicktext/store.json"
//!
//! [date_formats]
//! long = "%A, %B %-d, %Y"
//! short = "%Y-%m-%d"
//! monthname = "%B"
//! seconds = "%H:%M:%S"
//! noseconds = "%H:%M"
//!
//! [url]
//! timeout_secs = 10
//! debug = true
//!
//! [script]
//! interpreter = "sh"
//! timeout_secs = 30
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use quicktext::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = GlobalConfig::load().await?;
//! config.debug = true;
//! config.save().await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::utils::expand_path;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "QUICKTEXT_CONFIG_PATH";

/// Commented starter configuration written by `quicktext config init`.
const EXAMPLE_CONFIG: &str = r#"# Quicktext configuration

# Render resolver failures as "Quicktext error in TAG: <message>" instead of
# removing the directive.
debug = false

# Template library with [[groups]] of texts and [[scripts]].
templates = "~/.config/quicktext/templates.toml"

# Durable values such as the running counter.
# store = "~/.local/share/quicktext/store.json"

# chrono format strings used by [[DATE=...]] and [[TIME=...]]
[date_formats]
long = "%A, %B %-d, %Y"
short = "%Y-%m-%d"
monthname = "%B"
seconds = "%H:%M:%S"
noseconds = "%H:%M"

[url]
timeout_secs = 10
# Failed requests resolve to a diagnostic text instead of nothing.
debug = true

[script]
interpreter = "sh"
timeout_secs = 30
"#;

/// Format strings for `DATE` and `TIME` directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormats {
    /// `[[DATE=long]]`
    pub long: String,
    /// `[[DATE]]` and `[[DATE=short]]`
    pub short: String,
    /// `[[DATE=monthname]]`
    pub monthname: String,
    /// `[[TIME=seconds]]`
    pub seconds: String,
    /// `[[TIME]]` and `[[TIME=noseconds]]`
    pub noseconds: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            long: "%A, %B %-d, %Y".to_string(),
            short: "%Y-%m-%d".to_string(),
            monthname: "%B".to_string(),
            seconds: "%H:%M:%S".to_string(),
            noseconds: "%H:%M".to_string(),
        }
    }
}

/// Settings for `[[URL=...]]` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Whether failed requests resolve to a diagnostic text
    pub debug: bool,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            debug: true,
        }
    }
}

/// Settings for `[[SCRIPT=...]]` execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter that runs script bodies
    pub interpreter: String,
    /// Maximum run time in seconds
    pub timeout_secs: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "sh".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Global configuration structure for Quicktext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// Render resolver failures as a diagnostic string instead of empty text.
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,

    /// Template library file. Tilde-expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,

    /// Durable store file. Tilde-expanded; see [`GlobalConfig::store_path`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,

    /// Date and time formats.
    #[serde(default)]
    pub date_formats: DateFormats,

    /// URL request settings.
    #[serde(default)]
    pub url: UrlConfig,

    /// Script execution settings.
    #[serde(default)]
    pub script: ScriptConfig,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl GlobalConfig {
    /// Load configuration from the default location, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML syntax
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_or_default(&path).await
    }

    /// Load configuration from an explicit path when given, otherwise from the
    /// default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_or_default(&expand_path(&path)).await,
            None => Self::load().await,
        }
    }

    async fn load_or_default(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load_from(path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid configuration TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to the default location.
    pub async fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path).await
    }

    /// Save configuration as pretty TOML, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Write the commented starter configuration to `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file already exists or cannot be written.
    pub async fn write_example(path: &Path) -> Result<()> {
        if fs::try_exists(path).await.unwrap_or(false) {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        fs::write(path, EXAMPLE_CONFIG)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// The configuration [`write_example`](Self::write_example) produces.
    #[must_use]
    pub fn init_example() -> Self {
        Self {
            templates: Some(PathBuf::from("~/.config/quicktext/templates.toml")),
            ..Self::default()
        }
    }

    /// Default configuration file path.
    ///
    /// `QUICKTEXT_CONFIG_PATH` wins when set; otherwise the platform config
    /// directory is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|path| !path.is_empty()) {
            return Ok(expand_path(Path::new(&path)));
        }

        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine config directory"))?;
        Ok(dir.join("quicktext").join("config.toml"))
    }

    /// Path of the durable store: the configured one, or
    /// `<data dir>/quicktext/store.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the platform data
    /// directory cannot be determined.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store {
            return Ok(expand_path(path));
        }
        let dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Unable to determine data directory"))?;
        Ok(dir.join("quicktext").join("store.json"))
    }

    /// Path of the template library, if one is configured.
    #[must_use]
    pub fn templates_path(&self) -> Option<PathBuf> {
        self.templates.as_deref().map(expand_path)
    }
}
