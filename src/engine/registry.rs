//! Resolver registry: tag → (minimum arguments, resolver).
//!
//! The registry is built once and shared between sessions behind an `Arc`.
//! Tags without an entry, and directives with fewer arguments than the entry
//! requires, resolve to empty text without invoking anything.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::cache::{CacheScope, CachedValue};
use super::session::ExpansionSession;
use super::tag::TagKind;
use crate::config::GlobalConfig;

/// A data provider for one directive tag.
///
/// Resolution is split in two steps so the expensive part can be memoized:
/// [`fetch`](Resolver::fetch) produces the underlying fact and runs at most once
/// per [cache key](Resolver::scope) and session; [`render`](Resolver::render)
/// turns the fact into text using per-directive formatting arguments and runs on
/// every dispatch.
///
/// `fetch` receives the whole session, so it can read compose state through
/// [`ExpansionSession::details`] or pull another tag's data through
/// [`ExpansionSession::get_or_compute`] (the URL resolver posts recipient data
/// this way).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Cache scope for this argument list. Defaults to one entry per session.
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::PerSession
    }

    /// Compute the underlying data. May have side effects.
    async fn fetch(
        &self,
        arguments: &[String],
        session: &mut ExpansionSession,
    ) -> Result<CachedValue>;

    /// Format fetched data for one directive.
    fn render(&self, value: &CachedValue, _arguments: &[String]) -> String {
        value.as_text().unwrap_or_default()
    }
}

/// A registered resolver and its argument requirement.
#[derive(Clone)]
pub struct ResolverEntry {
    /// Minimum number of arguments a directive must carry to be dispatched
    pub min_arguments: usize,
    /// The resolver implementation
    pub resolver: Arc<dyn Resolver>,
}

impl fmt::Debug for ResolverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverEntry").field("min_arguments", &self.min_arguments).finish()
    }
}

/// Mapping from tag to resolver.
#[derive(Default, Clone, Debug)]
pub struct ResolverRegistry {
    entries: HashMap<TagKind, ResolverEntry>,
}

impl ResolverRegistry {
    /// Create an empty registry. Every directive resolves to empty text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in resolver.
    #[must_use]
    pub fn standard(config: &GlobalConfig) -> Self {
        let mut registry = Self::new();
        crate::resolvers::register_builtins(&mut registry, config);
        registry
    }

    /// Register (or replace) the resolver for `tag`.
    pub fn register<R>(&mut self, tag: TagKind, min_arguments: usize, resolver: R) -> &mut Self
    where
        R: Resolver + 'static,
    {
        self.register_shared(tag, min_arguments, Arc::new(resolver))
    }

    /// Register (or replace) an already shared resolver for `tag`.
    pub fn register_shared(
        &mut self,
        tag: TagKind,
        min_arguments: usize,
        resolver: Arc<dyn Resolver>,
    ) -> &mut Self {
        self.entries.insert(
            tag,
            ResolverEntry {
                min_arguments,
                resolver,
            },
        );
        self
    }

    /// The entry registered for `tag`.
    #[must_use]
    pub fn entry(&self, tag: TagKind) -> Option<&ResolverEntry> {
        self.entries.get(&tag)
    }

    /// Look up an entry by tag name, case-insensitively.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(TagKind, &ResolverEntry)> {
        let tag = name.parse::<TagKind>().ok()?;
        self.entry(tag).map(|entry| (tag, entry))
    }

    /// The resolver to dispatch to, if `tag` is registered and `argument_count`
    /// satisfies its minimum.
    #[must_use]
    pub fn admit(&self, tag: TagKind, argument_count: usize) -> Option<Arc<dyn Resolver>> {
        let entry = self.entries.get(&tag)?;
        if argument_count < entry.min_arguments {
            tracing::debug!(
                "{} needs {} argument(s), got {}; resolving to empty text",
                tag,
                entry.min_arguments,
                argument_count
            );
            return None;
        }
        Some(Arc::clone(&entry.resolver))
    }

    /// Registered tags in canonical order.
    #[must_use]
    pub fn tags(&self) -> Vec<TagKind> {
        TagKind::ALL.into_iter().filter(|tag| self.entries.contains_key(tag)).collect()
    }
}
