//! List the directives one expansion pass would resolve.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::read_template;
use crate::engine::tokenize;

/// Print the directives found in a template, one per line.
#[derive(Args, Debug)]
pub struct TokenizeCommand {
    /// Template file; `-` or nothing reads stdin
    file: Option<PathBuf>,

    /// Print only the raw directive text
    #[arg(long)]
    raw: bool,
}

impl TokenizeCommand {
    /// Execute the command.
    pub async fn execute(self) -> Result<()> {
        let (text, _) = read_template(self.file.as_deref()).await?;
        let directives = tokenize(&text);
        tracing::debug!("Found {} directive(s)", directives.len());

        for directive in directives {
            if self.raw {
                println!("{}", directive.raw);
                continue;
            }
            let arguments: Vec<String> =
                directive.arguments.iter().map(|argument| format!("{argument:?}")).collect();
            println!(
                "{:<10} [{}] {}",
                directive.tag.as_str().green().bold(),
                arguments.join(", "),
                directive.raw.dimmed()
            );
        }
        Ok(())
    }
}
