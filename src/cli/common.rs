//! Shared wiring for the commands that run an expansion.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{GlobalConfig, TemplateLibrary};
use crate::engine::{ExpansionSession, ResolverRegistry};
use crate::host::{
    ComposeContext, FileStore, HostServices, NonInteractivePrompter, Prompter, StaticComposeHost,
    StdoutSink, TerminalPrompter,
};

/// Options describing the compose window an expansion runs against.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Compose context file (TOML) with recipients, identities, contacts and
    /// attachments. An empty compose window is assumed when omitted.
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Template library file (TOML). Defaults to the `templates` entry of the
    /// configuration.
    #[arg(long, value_name = "FILE")]
    pub templates: Option<PathBuf>,

    /// Insert as plain text even when the editor is in rich-text mode.
    #[arg(long)]
    pub plain: bool,

    /// Append a space after the inserted content.
    #[arg(long)]
    pub extra_space: bool,

    /// Answer every INPUT prompt with its default instead of asking.
    #[arg(long)]
    pub non_interactive: bool,
}

impl SessionArgs {
    /// Load the compose context, or an empty one.
    pub async fn load_context(&self) -> Result<ComposeContext> {
        match &self.context {
            Some(path) => ComposeContext::load_from(path).await,
            None => Ok(ComposeContext::default()),
        }
    }

    /// Load the template library from `--templates`, then from the configured
    /// path. A configured library that does not exist yet is treated as empty.
    pub async fn load_templates(&self, config: &GlobalConfig) -> Result<TemplateLibrary> {
        if let Some(path) = &self.templates {
            return TemplateLibrary::load_from(path).await;
        }
        match config.templates_path() {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                TemplateLibrary::load_from(&path).await
            }
            Some(path) => {
                tracing::debug!("Template library {} does not exist", path.display());
                Ok(TemplateLibrary::default())
            }
            None => Ok(TemplateLibrary::default()),
        }
    }

    /// Build a session over the stock command-line collaborators.
    ///
    /// `stdin_taken` tells whether the template itself was read from stdin, in
    /// which case prompts cannot be answered interactively.
    pub async fn build_session(
        &self,
        config: GlobalConfig,
        templates: TemplateLibrary,
        stdin_taken: bool,
    ) -> Result<ExpansionSession> {
        let context = self.load_context().await?;
        let store_path = config.store_path()?;

        let interactive = !self.non_interactive && !stdin_taken && std::io::stdin().is_terminal();
        let prompter: Arc<dyn Prompter> = if interactive {
            Arc::new(TerminalPrompter)
        } else {
            Arc::new(NonInteractivePrompter)
        };

        let services = HostServices {
            compose: Arc::new(StaticComposeHost::new(context)),
            prompter,
            store: Arc::new(FileStore::new(store_path)),
            sink: Arc::new(StdoutSink),
        };

        let registry = ResolverRegistry::standard(&config);
        Ok(ExpansionSession::new(Arc::new(registry), services)
            .with_templates(Arc::new(templates))
            .with_config(Arc::new(config))
            .with_force_as_text(self.plain))
    }
}

/// Read a template from `path`, or from stdin when `path` is `None` or `-`.
///
/// Returns the text and whether stdin was consumed.
pub async fn read_template(path: Option<&Path>) -> Result<(String, bool)> {
    match path {
        Some(path) if path != Path::new("-") => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            Ok((text, false))
        }
        _ => {
            let text = tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
                .await
                .context("Failed to spawn blocking task for stdin")?
                .context("Failed to read template from stdin")?;
            Ok((text, true))
        }
    }
}

/// Load the configuration named by `--config`, the environment or the default path.
pub async fn load_config(config_path: Option<PathBuf>) -> Result<GlobalConfig> {
    GlobalConfig::load_with_optional(config_path).await.context("Failed to load configuration")
}
