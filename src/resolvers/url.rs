//! `[[URL=address|options]]` - the body of an HTTP response.
//!
//! The options argument is a `;`-separated list. Tag names among `to`, `att`,
//! `orgheader`, `orgatt`, `from`, `version`, `date`, `time`, `subject`,
//! `clipboard`, `selection` and `counter` attach that tag's data to the
//! request as form fields; `post`, `get` and `options` pick the method (POST
//! by default) and `debug` turns failures into diagnostic text.
//!
//! Structured data is flattened PHP-style:
//!
//! | Data | Fields |
//! |------|--------|
//! | subject, counter | `subject=...` |
//! | from, version, date, time | `from[email]=...` |
//! | to, orgheader | `to[email][0]=...` |
//! | att, orgatt | `att[0][name]=...` |
//!
//! POST sends the fields as an `application/x-www-form-urlencoded` body; GET
//! and OPTIONS send them in the query string.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tracing::{debug, warn};

use crate::config::UrlConfig;
use crate::core::QuicktextError;
use crate::engine::{CacheScope, CachedValue, ExpansionSession, Resolver, TagKind};

const DATA_TAGS: [TagKind; 12] = [
    TagKind::To,
    TagKind::Att,
    TagKind::OrgHeader,
    TagKind::OrgAtt,
    TagKind::From,
    TagKind::Version,
    TagKind::Date,
    TagKind::Time,
    TagKind::Subject,
    TagKind::Clipboard,
    TagKind::Selection,
    TagKind::Counter,
];

/// Parsed options argument of a URL directive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlOptions {
    method: Method,
    debug: bool,
    data: Vec<TagKind>,
}

impl UrlOptions {
    fn parse(options: Option<&str>) -> Self {
        let mut parsed = Self {
            method: Method::POST,
            debug: false,
            data: Vec::new(),
        };
        for option in options.unwrap_or_default().split(';') {
            match option.trim().to_lowercase().as_str() {
                "post" => parsed.method = Method::POST,
                "get" => parsed.method = Method::GET,
                "options" => parsed.method = Method::OPTIONS,
                "debug" => parsed.debug = true,
                "" => {}
                other => match other.parse::<TagKind>() {
                    Ok(tag) if DATA_TAGS.contains(&tag) => parsed.data.push(tag),
                    _ => debug!("Ignoring unknown URL option '{}'", other),
                },
            }
        }
        parsed
    }
}

/// Flatten a tag's data into form fields named after `name`.
fn post_fields(name: &str, value: &CachedValue) -> Vec<(String, String)> {
    match value {
        CachedValue::Text(_) | CachedValue::Number(_) => {
            vec![(name.to_string(), value.as_text().unwrap_or_default())]
        }
        CachedValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (format!("{name}[{index}]"), item.clone()))
            .collect(),
        CachedValue::Map(fields) => fields
            .iter()
            .map(|(key, item)| (format!("{name}[{key}]"), item.clone()))
            .collect(),
        CachedValue::MultiMap(fields) => fields
            .iter()
            .flat_map(|(key, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(move |(index, item)| (format!("{name}[{key}][{index}]"), item.clone()))
            })
            .collect(),
        CachedValue::Records(records) => records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| {
                record
                    .iter()
                    .map(move |(key, item)| (format!("{name}[{index}][{key}]"), item.clone()))
            })
            .collect(),
    }
}

/// Issues the requests of `URL` directives with a shared HTTP client.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    client: Client,
}

impl UrlResolver {
    /// Build a resolver whose requests time out after `config.timeout_secs`.
    #[must_use]
    pub fn new(config: &UrlConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("quicktext/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure the HTTP client, using defaults: {}", e);
                Client::new()
            });
        Self {
            client,
        }
    }

    async fn request(&self, url: Url, method: Method, fields: &[(String, String)]) -> Result<String, String> {
        let request = if method == Method::POST {
            self.client.post(url).form(fields)
        } else {
            self.client.request(method, url).query(fields)
        };

        match request.send().await {
            Ok(response) if response.status().as_u16() == 200 => response
                .text()
                .await
                .map_err(|e| format!("Quicktext global error: {}", e.status().map_or(0, |s| s.as_u16()))),
            Ok(response) => Err(format!("Quicktext onLoad error: {}", response.status().as_u16())),
            Err(e) if e.is_timeout() => Err("Quicktext timeout".to_string()),
            Err(e) => {
                debug!("Request error: {}", e);
                Err(format!("Quicktext global error: {}", e.status().map_or(0, |s| s.as_u16())))
            }
        }
    }
}

#[async_trait]
impl Resolver for UrlResolver {
    fn scope(&self, arguments: &[String]) -> CacheScope {
        CacheScope::PerArguments(arguments.join("|"))
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let address = arguments.first().map(|url| url.trim()).unwrap_or_default();
        if address.is_empty() {
            return Ok(CachedValue::Text(String::new()));
        }
        let url = Url::parse(address).map_err(|e| QuicktextError::UrlRequest {
            url: address.to_string(),
            reason: e.to_string(),
        })?;

        let options = UrlOptions::parse(arguments.get(1).map(String::as_str));
        let mut fields = Vec::new();
        for tag in &options.data {
            match session.get_or_compute(*tag, &[]).await {
                Ok(value) => fields.extend(post_fields(&tag.as_str().to_lowercase(), &value)),
                Err(e) => warn!("Leaving {} data out of the request to {}: {:#}", tag, address, e),
            }
        }

        debug!("{} {} with {} field(s)", options.method, url, fields.len());
        match self.request(url, options.method, &fields).await {
            Ok(body) => Ok(CachedValue::Text(body)),
            Err(diagnostic) => {
                warn!("Request to {} failed: {}", address, diagnostic);
                let show = options.debug || session.config().url.debug;
                Ok(CachedValue::Text(if show { diagnostic } else { String::new() }))
            }
        }
    }
}
