//! Inspect or reset the durable `[[COUNTER]]` value.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;

use super::common::load_config;
use crate::host::{FileStore, KeyValueStore};
use crate::resolvers::COUNTER_KEY;

/// Manage the counter used by `[[COUNTER]]`.
#[derive(Args, Debug)]
pub struct CounterCommand {
    #[command(subcommand)]
    command: Option<CounterSubcommands>,
}

#[derive(Subcommand, Debug)]
enum CounterSubcommands {
    /// Show the last value handed out (default)
    Show,

    /// Set the counter; the next expansion uses VALUE + 1
    Reset {
        /// New value
        #[arg(default_value_t = 0)]
        value: u64,
    },
}

impl CounterCommand {
    /// Execute the command.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path).await?;
        let store = FileStore::new(config.store_path()?);

        match self.command.unwrap_or(CounterSubcommands::Show) {
            CounterSubcommands::Show => {
                let value = store.get(COUNTER_KEY).await?.unwrap_or(Value::from(0));
                println!("{value}");
            }
            CounterSubcommands::Reset {
                value,
            } => {
                store.set(COUNTER_KEY, Value::from(value)).await?;
                eprintln!("{} Counter set to {}", "✓".green(), value);
            }
        }
        Ok(())
    }
}
