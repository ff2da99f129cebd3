//! Resolvers that pull content into the message: nested templates, files,
//! inline images and values typed by the user.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::config::TemplateKind;
use crate::core::QuicktextError;
use crate::engine::{CacheScope, CachedValue, ExpansionSession, Resolver};
use crate::utils::{ContentFlags, leaf_name, mime_from_extension};

/// `[[TEXT=group|name|flags]]` - another template from the library.
///
/// The body is inserted as-is; directives inside it are expanded by the next
/// pass. A plain-text template forces text insertion for the whole session.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextResolver;

#[async_trait]
impl Resolver for TextResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let (Some(group), Some(name)) = (arguments.first(), arguments.get(1)) else {
            return Ok(CachedValue::Text(String::new()));
        };

        let (kind, body) = session
            .templates()
            .text(group, name)
            .map(|template| (template.kind, template.body.clone()))
            .ok_or_else(|| QuicktextError::TemplateNotFound {
                group: group.clone(),
                name: name.clone(),
            })?;

        let flags = ContentFlags::from_arg(arguments, 2);
        if kind == TemplateKind::Text || flags.force_as_text {
            session.force_text_mode();
        }
        Ok(CachedValue::Text(flags.apply(body)))
    }
}

/// `[[FILE=path|flags]]` - contents of a text file. `~` and environment
/// variables in the path are expanded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResolver;

#[async_trait]
impl Resolver for FileResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let path = arguments.first().map(String::as_str).unwrap_or_default();
        if path.is_empty() {
            return Ok(CachedValue::Text(String::new()));
        }

        let compose = Arc::clone(&session.host().compose);
        let content = compose.read_text_file(Path::new(path)).await?;

        let flags = ContentFlags::from_arg(arguments, 1);
        if flags.force_as_text {
            session.force_text_mode();
        }
        Ok(CachedValue::Text(flags.apply(content)))
    }
}

/// `[[IMAGE=path]]` and `[[IMAGE=path|src]]` - an image embedded as a data URI.
///
/// Images only make sense in rich text; in a plain-text editor the directive
/// resolves to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageResolver;

#[async_trait]
impl Resolver for ImageResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let path = arguments.first().map(String::as_str).unwrap_or_default();
        if path.is_empty() || session.details().await?.is_plain_text {
            return Ok(CachedValue::Text(String::new()));
        }

        let compose = Arc::clone(&session.host().compose);
        let bytes = compose.read_binary_file(Path::new(path)).await?;

        let leaf = leaf_name(path);
        let uri = format!(
            "data:{};filename={};base64,{}",
            mime_from_extension(leaf),
            leaf,
            STANDARD.encode(&bytes)
        );

        let bare = arguments.get(1).is_some_and(|mode| mode.eq_ignore_ascii_case("src"));
        Ok(CachedValue::Text(if bare {
            uri
        } else {
            format!("<img src='{uri}'>")
        }))
    }
}

/// `[[INPUT=label|type|default]]` - ask the user for a value.
///
/// Each label is asked once per session; repeated directives reuse the answer.
/// A dismissed prompt resolves to empty text.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputResolver;

#[async_trait]
impl Resolver for InputResolver {
    fn scope(&self, arguments: &[String]) -> CacheScope {
        CacheScope::PerArguments(arguments.first().cloned().unwrap_or_default())
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let label = arguments.first().map(String::as_str).unwrap_or_default();
        let prompter = Arc::clone(&session.host().prompter);

        if arguments.get(1).is_some_and(|kind| kind == "select") {
            prompter
                .alert("'select' INPUT not implemented")
                .await
                .context("Failed to show alert")?;
            return Ok(CachedValue::Text(String::new()));
        }

        let default = arguments.get(2).map(String::as_str).unwrap_or_default();
        let answer = prompter
            .prompt(label, default)
            .await
            .with_context(|| format!("Failed to prompt for '{label}'"))?;
        Ok(CachedValue::Text(answer.unwrap_or_default()))
    }
}
