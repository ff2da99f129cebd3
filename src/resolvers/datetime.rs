//! `DATE` and `TIME`, both rendered from the session timestamp.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::core::QuicktextError;
use crate::engine::{CachedValue, ExpansionSession, Resolver};

fn format_timestamp(timestamp: &DateTime<Local>, format: &str) -> Result<String> {
    let mut text = String::new();
    write!(text, "{}", timestamp.format(format)).map_err(|_| QuicktextError::Config {
        message: format!("invalid date/time format '{format}'"),
    })?;
    Ok(text.trim().to_string())
}

fn formatted_fields(timestamp: &DateTime<Local>, formats: &[(&str, &str)]) -> Result<CachedValue> {
    let mut fields = BTreeMap::new();
    for (name, format) in formats {
        fields.insert((*name).to_string(), format_timestamp(timestamp, format)?);
    }
    Ok(CachedValue::Map(fields))
}

fn render_field(value: &CachedValue, arguments: &[String], default: &str) -> String {
    let CachedValue::Map(fields) = value else {
        return String::new();
    };
    let field = arguments.first().map_or(default, String::as_str);
    fields.get(field).cloned().unwrap_or_default()
}

/// `[[DATE]]`, `[[DATE=long]]`, `[[DATE=short]]`, `[[DATE=monthname]]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateResolver;

#[async_trait]
impl Resolver for DateResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let timestamp = session.timestamp();
        let formats = &session.config().date_formats;
        formatted_fields(
            &timestamp,
            &[
                ("long", formats.long.as_str()),
                ("short", formats.short.as_str()),
                ("monthname", formats.monthname.as_str()),
            ],
        )
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        render_field(value, arguments, "short")
    }
}

/// `[[TIME]]`, `[[TIME=seconds]]`, `[[TIME=noseconds]]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeResolver;

#[async_trait]
impl Resolver for TimeResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let timestamp = session.timestamp();
        let formats = &session.config().date_formats;
        formatted_fields(
            &timestamp,
            &[
                ("seconds", formats.seconds.as_str()),
                ("noseconds", formats.noseconds.as_str()),
            ],
        )
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        render_field(value, arguments, "noseconds")
    }
}
