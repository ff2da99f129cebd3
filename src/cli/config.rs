//! Global configuration management.
//!
//! ```bash
//! quicktext config init            # write a commented starter config
//! quicktext config init --force    # overwrite an existing one
//! quicktext config show            # print the effective configuration
//! quicktext config path            # print where the config file lives
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::GlobalConfig;
use crate::utils::expand_path;

/// Command to manage the global configuration file.
///
/// Without a subcommand the effective configuration is shown.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Write a commented starter configuration.
    ///
    /// Refuses to overwrite an existing file unless `--force` is given.
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Show,

    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the command against `config_path` or the default location.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => expand_path(&path),
            None => GlobalConfig::default_path()?,
        };

        match self.command {
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(&path, force).await,
            Some(ConfigSubcommands::Show) | None => Self::show(path).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
        }
    }

    async fn init(path: &std::path::Path, force: bool) -> Result<()> {
        if force && tokio::fs::try_exists(path).await.unwrap_or(false) {
            tokio::fs::remove_file(path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        GlobalConfig::write_example(path).await?;

        println!("{} Created config at {}", "✓".green(), path.display());
        println!("\n{}", "Next steps:".bold());
        println!("  1. Point `templates` at your template library");
        println!("  2. Adjust [date_formats] to your locale");
        Ok(())
    }

    async fn show(path: PathBuf) -> Result<()> {
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        let config = GlobalConfig::load_with_optional(Some(path.clone())).await?;

        if exists {
            eprintln!("{} {}", "Configuration:".bold(), path.display());
        } else {
            eprintln!(
                "{} {} does not exist, showing defaults. Run 'quicktext config init' to create it.",
                "Note:".yellow(),
                path.display()
            );
        }
        let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{content}");
        Ok(())
    }
}
