//! Command-line interface for Quicktext.
//!
//! The binary runs the expansion engine outside a mail client: the compose
//! window is described by a TOML context file, prompts go to the terminal,
//! the counter lives in a JSON store and expanded text is written to stdout.
//!
//! # Available Commands
//!
//! - `expand` - Expand a template file or stdin
//! - `text` - Expand a library template by group and name
//! - `tokenize` - List the directives of one pass
//! - `counter` - Inspect or reset the durable counter
//! - `config` - Manage the configuration file
//!
//! # Global Options
//!
//! - `-v/--verbose` - debug logging
//! - `-q/--quiet` - errors only
//! - `-c/--config <path>` - configuration file instead of the default
//!
//! Logs are written to stderr so stdout carries nothing but the expanded text.

pub mod common;
pub mod config;
pub mod counter;
pub mod expand;
pub mod tokenize;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Logging settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can build one without parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter directive for the subscriber. `None` defers to `RUST_LOG`,
    /// falling back to `warn`.
    pub log_level: Option<String>,

    /// Configuration file given with `--config`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber on stderr.
    ///
    /// Installing twice is harmless; the second attempt is ignored.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Expand `[[TAG=arg|...]]` directives in email templates.
#[derive(Parser, Debug)]
#[command(
    name = "quicktext",
    about = "Quicktext - expand [[TAG]] directives in email templates",
    version,
    long_about = "Quicktext expands [[TAG=arg|...]] directives (recipients, dates, files, nested \
                  templates, scripts, HTTP requests) in email compose templates until no directive is left."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Overrides `QUICKTEXT_CONFIG_PATH` and the platform default
    /// (`<config dir>/quicktext/config.toml`).
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expand a template file (or stdin) and print the result.
    Expand(expand::ExpandCommand),

    /// Expand a template from the library by group and name.
    Text(expand::TextCommand),

    /// List the directives found in a template.
    Tokenize(tokenize::TokenizeCommand),

    /// Inspect or reset the counter used by [[COUNTER]].
    Counter(counter::CounterCommand),

    /// Manage the configuration file.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Execute the parsed command line.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Expand(cmd) => cmd.execute(config.config_path).await,
            Commands::Text(cmd) => cmd.execute(config.config_path).await,
            Commands::Tokenize(cmd) => cmd.execute().await,
            Commands::Counter(cmd) => cmd.execute(config.config_path).await,
            Commands::Config(cmd) => cmd.execute(config.config_path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_levels() {
        let cli = Cli::parse_from(["quicktext", "-v", "tokenize"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

        let cli = Cli::parse_from(["quicktext", "--quiet", "-c", "/tmp/q.toml", "counter"]);
        let config = cli.build_config();
        assert_eq!(config.log_level.as_deref(), Some("error"));
        assert_eq!(config.config_path, Some(PathBuf::from("/tmp/q.toml")));

        let cli = Cli::parse_from(["quicktext", "config", "path"]);
        assert_eq!(cli.build_config(), CliConfig::new());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["quicktext", "-v", "-q", "tokenize"]).is_err());
    }

    #[test]
    fn test_expand_arguments() {
        let cli = Cli::try_parse_from([
            "quicktext",
            "expand",
            "reply.txt",
            "--context",
            "compose.toml",
            "--plain",
            "--report",
        ]);
        assert!(cli.is_ok());
    }
}
