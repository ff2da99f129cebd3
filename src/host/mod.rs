//! Host collaborators consumed by the expansion engine.
//!
//! The engine never talks to a mail client directly. Everything it needs from
//! the outside world goes through four traits:
//!
//! - [`ComposeHost`] - compose fields, identities, contacts, attachments, the
//!   message being replied to, clipboard, selection and local files
//! - [`Prompter`] - asks the user for a value or shows an error
//! - [`KeyValueStore`] - durable storage for persistent values such as the counter
//! - [`InsertionSink`] - receives the final expanded content
//!
//! Stock implementations back the command line: [`StaticComposeHost`] reads the
//! compose state from a TOML file, [`FileStore`] persists to a JSON file,
//! [`TerminalPrompter`] uses stdin/stderr and [`StdoutSink`] prints the result.

mod context;
mod prompt;
mod sink;
mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use context::{ComposeContext, StaticComposeHost, StoredMessage};
pub use prompt::{NonInteractivePrompter, TerminalPrompter};
pub use sink::{CURSOR_MARKER, StdoutSink, sanitize_html, take_cursor_marker};
pub use store::{FileStore, MemoryStore};

/// How content is inserted into the compose body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    /// Plain text editor or forced text insertion
    PlainText,
    /// HTML editor
    RichText,
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMode::PlainText => f.write_str("plain text"),
            ContentMode::RichText => f.write_str("rich text"),
        }
    }
}

/// Structured compose fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeDetails {
    /// Recipients, each `Display Name <address>` or a bare address
    pub to: Vec<String>,
    /// Carbon-copy recipients
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients
    pub bcc: Vec<String>,
    /// Reply-To addresses
    pub reply_to: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Explicit From override, if any
    pub from: Option<String>,
    /// Identity the message is sent from
    pub identity_id: Option<String>,
    /// Whether the editor is in plain-text mode
    pub is_plain_text: bool,
    /// Message being replied to or forwarded
    pub related_message_id: Option<String>,
}

/// A compose field that `[[HEADER=...]]` may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeField {
    To,
    Cc,
    Bcc,
    Subject,
    From,
    ReplyTo,
}

impl ComposeField {
    /// Parse a header name as written in a directive (`to`, `reply-to`, ...).
    #[must_use]
    pub fn from_header(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "to" => Some(Self::To),
            "cc" => Some(Self::Cc),
            "bcc" => Some(Self::Bcc),
            "subject" => Some(Self::Subject),
            "from" => Some(Self::From),
            "reply-to" => Some(Self::ReplyTo),
            _ => None,
        }
    }
}

/// A single-field update to the compose state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeUpdate {
    /// Field to replace
    pub field: ComposeField,
    /// New value
    pub value: String,
}

impl ComposeDetails {
    /// Apply an update in place. Address fields are replaced by a single entry.
    pub fn apply(&mut self, update: &ComposeUpdate) {
        let value = update.value.clone();
        match update.field {
            ComposeField::To => self.to = vec![value],
            ComposeField::Cc => self.cc = vec![value],
            ComposeField::Bcc => self.bcc = vec![value],
            ComposeField::ReplyTo => self.reply_to = vec![value],
            ComposeField::Subject => self.subject = value,
            ComposeField::From => self.from = Some(value),
        }
    }
}

/// A file attached to the message being composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFile {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time as reported by the host
    #[serde(default)]
    pub last_modified: String,
}

/// A sending identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    /// Identity key
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
}

/// An address book entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactCard {
    /// Card properties such as `PrimaryEmail`, `FirstName`, `LastName`
    pub properties: BTreeMap<String, String>,
}

impl ContactCard {
    /// Whether the card lists `email` as one of its addresses, case-insensitively.
    #[must_use]
    pub fn matches_email(&self, email: &str) -> bool {
        self.properties.iter().any(|(name, value)| {
            name.to_ascii_lowercase().contains("email") && value.eq_ignore_ascii_case(email)
        })
    }
}

/// An attachment of the message being replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginalAttachment {
    /// MIME type
    pub content_type: String,
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME part identifier
    pub part_name: String,
}

/// Headers and attachments of the message being replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginalMessage {
    /// Header name (lowercase) to its values
    pub headers: BTreeMap<String, Vec<String>>,
    /// Attachments
    pub attachments: Vec<OriginalAttachment>,
}

/// Name and version of the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Application name
    pub name: String,
    /// Application version
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "Quicktext".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Content handed to the [`InsertionSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Plain text or sanitized HTML
    pub content: String,
    /// How the content must be inserted
    pub mode: ContentMode,
    /// Whether the host should add spacing around the inserted content
    pub extra_space: bool,
}

/// Access to the compose window and the environment around it.
#[async_trait]
pub trait ComposeHost: Send + Sync {
    /// Current compose fields.
    async fn details(&self) -> Result<ComposeDetails>;

    /// Replace one compose field.
    async fn set_details(&self, update: ComposeUpdate) -> Result<()>;

    /// Files attached to the message being composed.
    async fn attachments(&self) -> Result<Vec<AttachmentFile>>;

    /// The identity with the given key.
    async fn identity(&self, id: &str) -> Result<Identity>;

    /// Local address book entries matching `query`.
    async fn search_contacts(&self, query: &str) -> Result<Vec<ContactCard>>;

    /// Headers and attachments of a stored message.
    async fn original_message(&self, id: &str) -> Result<OriginalMessage>;

    /// Current editor selection in the given representation.
    async fn selection(&self, mode: ContentMode) -> Result<String>;

    /// Clipboard text.
    async fn clipboard(&self) -> Result<String>;

    /// Read a local text file.
    async fn read_text_file(&self, path: &Path) -> Result<String>;

    /// Read a local binary file.
    async fn read_binary_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Host application name and version.
    async fn app_info(&self) -> Result<AppInfo>;
}

/// Interactive prompt and alert surface.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask the user for a value. `None` when the prompt was dismissed.
    async fn prompt(&self, label: &str, default: &str) -> Result<Option<String>>;

    /// Show an error or informational message.
    async fn alert(&self, message: &str) -> Result<()>;
}

/// Read-modify-write closure for [`KeyValueStore::update`].
pub type StoreUpdate = Box<dyn FnOnce(Option<serde_json::Value>) -> serde_json::Value + Send>;

/// Durable key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Write a value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Atomically replace a value with `update(current)` and return the new value.
    ///
    /// Implementations must serialize concurrent updates of the same key so
    /// read-increment-write sequences never lose an update.
    async fn update(&self, key: &str, update: StoreUpdate) -> Result<serde_json::Value>;
}

/// Receiver of the final expanded content.
#[async_trait]
pub trait InsertionSink: Send + Sync {
    /// Insert content into the compose body.
    async fn insert(&self, insertion: Insertion) -> Result<()>;
}

/// The set of host handles an expansion session works against.
#[derive(Clone)]
pub struct HostServices {
    /// Compose window access
    pub compose: Arc<dyn ComposeHost>,
    /// Prompt and alert surface
    pub prompter: Arc<dyn Prompter>,
    /// Durable store
    pub store: Arc<dyn KeyValueStore>,
    /// Content sink
    pub sink: Arc<dyn InsertionSink>,
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
