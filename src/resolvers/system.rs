//! Resolvers backed by the host application rather than the message:
//! the persistent counter, the application version and the clipboard.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::core::QuicktextError;
use crate::engine::{CachedValue, ExpansionSession, Resolver};

/// Store key holding the counter.
pub const COUNTER_KEY: &str = "counter";

fn next_counter(current: Option<Value>) -> Value {
    let current = match current {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Value::from(current.saturating_add(1))
}

/// `[[COUNTER]]` - a number that grows by one for every session that uses it.
///
/// The increment goes through [`KeyValueStore::update`](crate::host::KeyValueStore::update)
/// so concurrent sessions never read the same value.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterResolver;

#[async_trait]
impl Resolver for CounterResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let store = Arc::clone(&session.host().store);
        let value = store
            .update(COUNTER_KEY, Box::new(next_counter))
            .await
            .context("Failed to increment the counter")?;
        let number = value.as_u64().ok_or_else(|| {
            QuicktextError::store("update counter", format!("stored value {value} is not a number"))
        })?;
        tracing::debug!("Counter advanced to {}", number);
        Ok(CachedValue::Number(number))
    }
}

/// `[[VERSION]]`, `[[VERSION=number]]`, `[[VERSION=full]]` - host application version.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionResolver;

#[async_trait]
impl Resolver for VersionResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let compose = Arc::clone(&session.host().compose);
        let app = compose.app_info().await.context("Failed to read application info")?;
        Ok(CachedValue::Map(BTreeMap::from([
            ("full".to_string(), format!("{} {}", app.name, app.version)),
            ("number".to_string(), app.version),
        ])))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::Map(fields) = value else {
            return String::new();
        };
        let field = arguments.first().map_or("full", String::as_str);
        fields.get(field).cloned().unwrap_or_default()
    }
}

/// `[[CLIPBOARD]]` - clipboard text, trimmed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardResolver;

#[async_trait]
impl Resolver for ClipboardResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let compose = Arc::clone(&session.host().compose);
        let text = compose.clipboard().await.context("Failed to read the clipboard")?;
        Ok(CachedValue::Text(text.trim().to_string()))
    }
}
