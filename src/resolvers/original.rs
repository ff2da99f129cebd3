//! Resolvers over the message being replied to or forwarded.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::engine::{CachedValue, ExpansionSession, Resolver};
use crate::host::OriginalMessage;
use crate::utils::separator_arg;

async fn original_message(session: &mut ExpansionSession) -> Result<Option<OriginalMessage>> {
    let Some(id) = session.details().await?.related_message_id else {
        tracing::debug!("No related message, original message data is empty");
        return Ok(None);
    };
    let compose = Arc::clone(&session.host().compose);
    let message = compose
        .original_message(&id)
        .await
        .with_context(|| format!("Failed to read original message {id}"))?;
    Ok(Some(message))
}

/// `[[ORGHEADER=name|separator]]` - a header of the original message.
///
/// Header names are case-insensitive; repeated headers are joined with the
/// separator (`, ` by default).
#[derive(Debug, Default, Clone, Copy)]
pub struct OrgHeaderResolver;

#[async_trait]
impl Resolver for OrgHeaderResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let headers = original_message(session)
            .await?
            .map(|message| message.headers)
            .unwrap_or_default();
        Ok(CachedValue::MultiMap(headers))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::MultiMap(headers) = value else {
            return String::new();
        };
        arguments
            .first()
            .and_then(|name| headers.get(&name.to_lowercase()))
            .map(|values| values.join(&separator_arg(arguments, 1, ", ")))
            .unwrap_or_default()
    }
}

/// `[[ORGATT]]`, `[[ORGATT=separator]]` - attachment names of the original message.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrgAttResolver;

#[async_trait]
impl Resolver for OrgAttResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let attachments = original_message(session)
            .await?
            .map(|message| message.attachments)
            .unwrap_or_default();
        Ok(CachedValue::Records(
            attachments
                .into_iter()
                .map(|attachment| {
                    BTreeMap::from([
                        ("contenttype".to_string(), attachment.content_type),
                        ("name".to_string(), attachment.name),
                        ("size".to_string(), attachment.size.to_string()),
                        ("partname".to_string(), attachment.part_name),
                    ])
                })
                .collect(),
        ))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::Records(attachments) = value else {
            return String::new();
        };
        let names: Vec<&str> = attachments
            .iter()
            .filter_map(|attachment| attachment.get("name").map(String::as_str))
            .collect();
        names.join(&separator_arg(arguments, 0, ", "))
    }
}
