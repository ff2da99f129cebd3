//! Expand templates and insert the result.
//!
//! # Examples
//!
//! ```bash
//! # Expand a template file against a compose context
//! quicktext expand reply.txt --context compose.toml
//!
//! # Expand from stdin
//! echo 'Hi [[TO=firstname]]' | quicktext expand --context compose.toml
//!
//! # Expand a library template by group and name
//! quicktext text Replies thanks --context compose.toml --templates templates.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{SessionArgs, load_config, read_template};
use crate::config::TemplateKind;
use crate::core::QuicktextError;
use crate::engine::{Expansion, ExpansionSession, MAX_PASSES};

/// Expand a template file or stdin.
#[derive(Args, Debug)]
pub struct ExpandCommand {
    /// Template file; `-` or nothing reads stdin
    file: Option<PathBuf>,

    #[command(flatten)]
    session: SessionArgs,

    /// Print pass and cache statistics to stderr
    #[arg(long)]
    report: bool,
}

impl ExpandCommand {
    /// Execute the command.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path).await?;
        let (text, stdin_taken) = read_template(self.file.as_deref()).await?;
        let templates = self.session.load_templates(&config).await?;
        let session = self.session.build_session(config, templates, stdin_taken).await?;
        expand_and_insert(session, &text, self.session.extra_space, self.report).await
    }
}

/// Expand a template from the library by group and name.
#[derive(Args, Debug)]
pub struct TextCommand {
    /// Template group
    group: String,

    /// Template name within the group
    name: String,

    #[command(flatten)]
    session: SessionArgs,

    /// Print pass and cache statistics to stderr
    #[arg(long)]
    report: bool,
}

impl TextCommand {
    /// Execute the command.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path).await?;
        let templates = self.session.load_templates(&config).await?;

        let template = templates.text(&self.group, &self.name).cloned().ok_or_else(|| {
            QuicktextError::TemplateNotFound {
                group: self.group.clone(),
                name: self.name.clone(),
            }
        })?;

        let mut session = self.session.build_session(config, templates, false).await?;
        if template.kind == TemplateKind::Text {
            session.force_text_mode();
        }
        expand_and_insert(session, &template.body, self.session.extra_space, self.report).await
    }
}

async fn expand_and_insert(
    mut session: ExpansionSession,
    text: &str,
    extra_space: bool,
    report: bool,
) -> Result<()> {
    let expansion = session.parse_with_report(text).await?;
    if report {
        print_report(&expansion, &session);
    }
    session.insert_body(&expansion.text, extra_space).await
}

fn print_report(expansion: &Expansion, session: &ExpansionSession) {
    let (hits, misses) = session.cache().stats();
    eprintln!(
        "{} {} pass(es), {} cache hit(s), {} miss(es)",
        "report:".cyan().bold(),
        expansion.passes,
        hits,
        misses
    );
    if expansion.reached_ceiling {
        eprintln!(
            "{} stopped after {} passes with directives still expanding",
            "warning:".yellow().bold(),
            MAX_PASSES
        );
    }
}
