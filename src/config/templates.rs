//! The template library: named texts organized in groups, plus named scripts.
//!
//! ```toml
//! [[groups]]
//! name = "Replies"
//!
//! [[groups.texts]]
//! name = "Thanks"
//! kind = "text"
//! body = "Hi [[TO=firstname]],\nthanks for your mail.\n[[FROM=firstname]]"
//!
//! [[scripts]]
//! name = "weekday"
//! body = "date +%A"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// How a template's body is meant to be inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Plain text. Expanding it forces text insertion for the whole session.
    Text,
    /// HTML fragment
    #[default]
    Html,
}

/// A named text template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Name within its group
    pub name: String,
    /// Insertion kind
    #[serde(default)]
    pub kind: TemplateKind,
    /// Template body, possibly containing directives
    #[serde(default)]
    pub body: String,
}

/// A named group of templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroup {
    /// Group name
    pub name: String,
    /// Templates in this group
    #[serde(default)]
    pub texts: Vec<Template>,
}

/// A named script run by `[[SCRIPT=name]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Script name
    pub name: String,
    /// Script source, run by the configured interpreter
    pub body: String,
}

/// Every group and script available to an expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLibrary {
    /// Template groups, in file order
    #[serde(default)]
    pub groups: Vec<TemplateGroup>,
    /// Scripts, in file order
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl TemplateLibrary {
    /// Load a library from a TOML file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read template library {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse template library {}", path.display()))
    }

    /// Parse a library from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The template `name` in group `group`. Names are matched exactly; the
    /// first match wins.
    #[must_use]
    pub fn text(&self, group: &str, name: &str) -> Option<&Template> {
        self.groups
            .iter()
            .filter(|candidate| candidate.name == group)
            .flat_map(|candidate| candidate.texts.iter())
            .find(|template| template.name == name)
    }

    /// The script called `name`.
    #[must_use]
    pub fn script(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|script| script.name == name)
    }

    /// Total number of templates across all groups.
    #[must_use]
    pub fn text_count(&self) -> usize {
        self.groups.iter().map(|group| group.texts.len()).sum()
    }
}
