//! A compose host backed by a static description of the compose window.
//!
//! The command line has no mail client to talk to, so it reads the compose
//! state from a TOML file:
//!
//! ```toml
//! clipboard = "copied text"
//! selection_text = "selected"
//! selection_html = "<i>selected</i>"
//!
//! [details]
//! to = ["Ada Lovelace <ada@example.com>"]
//! subject = "Analytical engine"
//! identity_id = "id1"
//! related_message_id = "msg-1"
//!
//! [app]
//! name = "Thunderbird"
//! version = "128.3.0"
//!
//! [[identities]]
//! id = "id1"
//! email = "charles@example.com"
//! name = "Charles Babbage"
//!
//! [[contacts]]
//! properties = { PrimaryEmail = "ada@example.com", FirstName = "Ada", LastName = "Lovelace" }
//!
//! [[attachments]]
//! name = "notes.pdf"
//! size = 20480
//!
//! [[messages]]
//! id = "msg-1"
//! headers = { subject = ["Re: engine"], from = ["Ada <ada@example.com>"] }
//! ```
//!
//! Field updates made by `HEADER` directives are kept in memory.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{
    AppInfo, AttachmentFile, ComposeDetails, ComposeHost, ComposeUpdate, ContactCard, ContentMode,
    Identity, OriginalAttachment, OriginalMessage,
};
use crate::core::QuicktextError;
use crate::utils::expand_path;

/// A stored message that can be replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredMessage {
    /// Message identifier referenced by `details.related_message_id`
    pub id: String,
    /// Header name to values
    pub headers: std::collections::BTreeMap<String, Vec<String>>,
    /// Attachments of the message
    pub attachments: Vec<OriginalAttachment>,
}

/// Everything a [`StaticComposeHost`] knows about the compose window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeContext {
    /// Compose fields
    pub details: ComposeDetails,
    /// Host application
    pub app: AppInfo,
    /// Sending identities
    pub identities: Vec<Identity>,
    /// Local address book
    pub contacts: Vec<ContactCard>,
    /// Files attached to the message being composed
    pub attachments: Vec<AttachmentFile>,
    /// Messages that can be replied to
    pub messages: Vec<StoredMessage>,
    /// Clipboard text
    pub clipboard: String,
    /// Selected text in plain-text form
    pub selection_text: String,
    /// Selected text in HTML form
    pub selection_html: String,
}

impl ComposeContext {
    /// Load a context from a TOML file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read compose context from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse compose context from {}", path.display()))
    }
}

/// [`ComposeHost`] over a [`ComposeContext`]. Files are read from the local disk.
#[derive(Debug, Default)]
pub struct StaticComposeHost {
    context: RwLock<ComposeContext>,
}

impl StaticComposeHost {
    /// Serve `context`.
    #[must_use]
    pub fn new(context: ComposeContext) -> Self {
        Self {
            context: RwLock::new(context),
        }
    }

    /// The current context, including updates made through `set_details`.
    pub async fn snapshot(&self) -> ComposeContext {
        self.context.read().await.clone()
    }
}

#[async_trait]
impl ComposeHost for StaticComposeHost {
    async fn details(&self) -> Result<ComposeDetails> {
        Ok(self.context.read().await.details.clone())
    }

    async fn set_details(&self, update: ComposeUpdate) -> Result<()> {
        tracing::debug!("Setting compose field {:?}", update.field);
        self.context.write().await.details.apply(&update);
        Ok(())
    }

    async fn attachments(&self) -> Result<Vec<AttachmentFile>> {
        Ok(self.context.read().await.attachments.clone())
    }

    async fn identity(&self, id: &str) -> Result<Identity> {
        let context = self.context.read().await;
        context
            .identities
            .iter()
            .find(|identity| identity.id == id)
            .cloned()
            .ok_or_else(|| QuicktextError::host_call("get identity", format!("unknown identity '{id}'")).into())
    }

    async fn search_contacts(&self, query: &str) -> Result<Vec<ContactCard>> {
        let query = query.to_lowercase();
        let context = self.context.read().await;
        Ok(context
            .contacts
            .iter()
            .filter(|card| card.properties.values().any(|value| value.to_lowercase().contains(&query)))
            .cloned()
            .collect())
    }

    async fn original_message(&self, id: &str) -> Result<OriginalMessage> {
        let context = self.context.read().await;
        let message = context
            .messages
            .iter()
            .find(|message| message.id == id)
            .ok_or_else(|| QuicktextError::host_call("get message", format!("unknown message '{id}'")))?;
        Ok(OriginalMessage {
            headers: message
                .headers
                .iter()
                .map(|(name, values)| (name.to_lowercase(), values.clone()))
                .collect(),
            attachments: message.attachments.clone(),
        })
    }

    async fn selection(&self, mode: ContentMode) -> Result<String> {
        let context = self.context.read().await;
        Ok(match mode {
            ContentMode::PlainText => context.selection_text.clone(),
            ContentMode::RichText => context.selection_html.clone(),
        })
    }

    async fn clipboard(&self) -> Result<String> {
        Ok(self.context.read().await.clipboard.clone())
    }

    async fn read_text_file(&self, path: &Path) -> Result<String> {
        let resolved = expand_path(path);
        tokio::fs::read_to_string(&resolved).await.map_err(|e| {
            QuicktextError::FileRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn read_binary_file(&self, path: &Path) -> Result<Vec<u8>> {
        let resolved = expand_path(path);
        tokio::fs::read(&resolved).await.map_err(|e| {
            QuicktextError::FileRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn app_info(&self) -> Result<AppInfo> {
        Ok(self.context.read().await.app.clone())
    }
}
