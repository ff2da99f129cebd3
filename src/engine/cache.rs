//! Per-session memoization of resolver data.
//!
//! This module provides the cache that makes resolvers idempotent across the
//! passes of one expansion. Resolvers are invoked once per directive per pass,
//! and the fixed-point loop may run many passes; the cache guarantees that a
//! tag's underlying fact (recipient list, counter value, original headers) is
//! fetched once per session no matter how many directives reference it.
//!
//! # Scopes
//!
//! Each resolver picks a [`CacheScope`] for a given argument list:
//! - [`CacheScope::PerSession`] keys the fact by tag alone. Two `[[TO]]` directives
//!   with different formatting arguments share one recipient lookup.
//! - [`CacheScope::PerArguments`] adds a discriminator to the key, for facts that
//!   genuinely depend on the arguments (one prompt per `INPUT` field name, one
//!   request per `URL` argument list).
//! - [`CacheScope::Uncached`] bypasses the cache entirely.
//!
//! # Persistence
//!
//! Entries whose tag is [persistent](TagKind::is_persistent) survive
//! [`SessionCache::clear_transient`] and are carried into new sessions by
//! [`SessionCache::persistent_snapshot`]. Everything else is dropped when the
//! caller requests a data reset.

use std::collections::{BTreeMap, HashMap};

use super::tag::TagKind;

/// How a resolver's fetched data is memoized for one argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    /// One entry per tag for the whole session.
    PerSession,
    /// One entry per tag and discriminator.
    PerArguments(String),
    /// Never cached; the resolver runs on every dispatch.
    Uncached,
}

/// Key of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The tag whose data is stored
    pub tag: TagKind,
    /// Argument-derived discriminator for [`CacheScope::PerArguments`]
    pub variant: Option<String>,
}

impl CacheKey {
    /// Build the key for `tag` under `scope`, or `None` when the scope is uncached.
    #[must_use]
    pub fn for_scope(tag: TagKind, scope: &CacheScope) -> Option<Self> {
        match scope {
            CacheScope::PerSession => Some(Self {
                tag,
                variant: None,
            }),
            CacheScope::PerArguments(variant) => Some(Self {
                tag,
                variant: Some(variant.clone()),
            }),
            CacheScope::Uncached => None,
        }
    }
}

/// Resolver data as stored in the cache.
///
/// The shape depends on the resolver: a scalar subject, a counter value, a
/// field map for the sender, a field → values map for recipients, or a list of
/// records for attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// Single string value
    Text(String),
    /// Numeric value (counter)
    Number(u64),
    /// Ordered list of strings
    List(Vec<String>),
    /// Field name to value
    Map(BTreeMap<String, String>),
    /// Field name to one value per item (recipients, headers)
    MultiMap(BTreeMap<String, Vec<String>>),
    /// One field map per item (attachments)
    Records(Vec<BTreeMap<String, String>>),
}

impl CachedValue {
    /// The text of a [`CachedValue::Text`] or the decimal form of a number.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            CachedValue::Text(text) => Some(text.clone()),
            CachedValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    persistent: bool,
}

/// Memoized resolver data for one expansion session.
#[derive(Debug, Default, Clone)]
pub struct SessionCache {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: usize,
    misses: usize,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a computed entry, counting the hit or miss.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<&CachedValue> {
        if let Some(entry) = self.entries.get(key) {
            self.hits += 1;
            Some(&entry.value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Whether an entry exists for `key`, without touching the statistics.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a computed value. Persistence follows the key's tag.
    pub fn record(&mut self, key: CacheKey, value: CachedValue) {
        let persistent = key.tag.is_persistent();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                persistent,
            },
        );
    }

    /// Drop every non-persistent entry.
    pub fn clear_transient(&mut self) {
        self.entries.retain(|_, entry| entry.persistent);
    }

    /// Drop every entry, persistent ones included.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// A fresh cache holding only the persistent entries, for seeding a new session.
    #[must_use]
    pub fn persistent_snapshot(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(_, entry)| entry.persistent)
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect(),
            hits: 0,
            misses: 0,
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache statistics as `(hits, misses)`.
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}
