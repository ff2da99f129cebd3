//! Resolvers over the compose window: attachments, subject, selection and
//! header updates.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::engine::{CacheScope, CachedValue, ExpansionSession, Resolver};
use crate::host::{ComposeField, ComposeUpdate, ContentMode};
use crate::utils::{nice_file_size, separator_arg};

/// `[[ATT]]`, `[[ATT=full]]`, `[[ATT=modified|\n]]` - files attached to the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttResolver;

#[async_trait]
impl Resolver for AttResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let compose = Arc::clone(&session.host().compose);
        let files = compose.attachments().await.context("Failed to list attachments")?;
        Ok(CachedValue::Records(
            files
                .into_iter()
                .map(|file| {
                    BTreeMap::from([
                        ("name".to_string(), file.name),
                        ("size".to_string(), file.size.to_string()),
                        ("modified".to_string(), file.last_modified),
                    ])
                })
                .collect(),
        ))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::Records(files) = value else {
            return String::new();
        };
        if files.is_empty() {
            return String::new();
        }

        let field = |file: &BTreeMap<String, String>, key: &str| file.get(key).cloned().unwrap_or_default();
        let items: Vec<String> = files
            .iter()
            .map(|file| match arguments.first().map(String::as_str) {
                Some("full") => {
                    let size = field(file, "size").parse().unwrap_or(0);
                    format!("{} ({})", field(file, "name"), nice_file_size(size))
                }
                Some("modified") => field(file, "modified"),
                _ => field(file, "name"),
            })
            .collect();

        items.join(&separator_arg(arguments, 1, ", ")).trim().to_string()
    }
}

/// `[[SUBJECT]]` - the compose subject.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubjectResolver;

#[async_trait]
impl Resolver for SubjectResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        Ok(CachedValue::Text(session.details().await?.subject))
    }
}

/// `[[SELECTION]]` - the editor selection, as HTML in rich mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionResolver;

#[async_trait]
impl Resolver for SelectionResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let mode = if session.details().await?.is_plain_text {
            ContentMode::PlainText
        } else {
            ContentMode::RichText
        };
        let compose = Arc::clone(&session.host().compose);
        let selection = compose.selection(mode).await.context("Failed to read the selection")?;
        Ok(CachedValue::Text(selection))
    }
}

/// `[[HEADER=field|value]]` - overwrite a compose field. Renders nothing.
///
/// Recognized fields are `to`, `cc`, `bcc`, `subject`, `from` and `reply-to`;
/// anything else is ignored. Each distinct directive is applied once per session.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderResolver;

#[async_trait]
impl Resolver for HeaderResolver {
    fn scope(&self, arguments: &[String]) -> CacheScope {
        CacheScope::PerArguments(arguments.join("|"))
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let (Some(name), Some(value)) = (arguments.first(), arguments.get(1)) else {
            return Ok(CachedValue::Text(String::new()));
        };

        match ComposeField::from_header(name) {
            Some(field) => {
                session
                    .set_details(ComposeUpdate {
                        field,
                        value: value.clone(),
                    })
                    .await?;
            }
            None => tracing::debug!("Ignoring HEADER directive for unsupported field '{}'", name),
        }
        Ok(CachedValue::Text(String::new()))
    }

    fn render(&self, _value: &CachedValue, _arguments: &[String]) -> String {
        String::new()
    }
}
