//! Prompt and alert surfaces for the command line.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;

use super::Prompter;

/// Prompts on stderr and reads answers from stdin.
///
/// An empty answer accepts the default; end of input dismisses the prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn prompt(&self, label: &str, default: &str) -> Result<Option<String>> {
        let label = label.to_string();
        let default = default.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let mut stderr = std::io::stderr().lock();
            if default.is_empty() {
                write!(stderr, "{} ", format!("{label}:").bold())?;
            } else {
                write!(stderr, "{} [{}] ", format!("{label}:").bold(), default.dimmed())?;
            }
            stderr.flush()?;

            let mut line = String::new();
            let read = std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read answer from stdin")?;
            if read == 0 {
                return Ok(None);
            }

            let answer = line.trim_end_matches(['\r', '\n']);
            Ok(Some(if answer.is_empty() { default } else { answer.to_string() }))
        })
        .await
        .context("Failed to spawn blocking task for prompt")?
    }

    async fn alert(&self, message: &str) -> Result<()> {
        eprintln!("{} {}", "!".yellow().bold(), message);
        Ok(())
    }
}

/// Answers every prompt with its default and logs alerts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

#[async_trait]
impl Prompter for NonInteractivePrompter {
    async fn prompt(&self, label: &str, default: &str) -> Result<Option<String>> {
        tracing::debug!("Answering prompt '{}' with its default", label);
        Ok(Some(default.to_string()))
    }

    async fn alert(&self, message: &str) -> Result<()> {
        tracing::warn!("{}", message);
        Ok(())
    }
}
