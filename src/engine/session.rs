//! Expansion sessions and the fixed-point expansion loop.
//!
//! An [`ExpansionSession`] lives for one insertion action. It owns the
//! [`SessionCache`], a handle to the shared [`ResolverRegistry`], the host
//! collaborators and the `force_as_text` flag that nested templates may raise.
//!
//! # Expansion
//!
//! [`ExpansionSession::parse`] repeats single passes until the text stops
//! changing or [`MAX_PASSES`] passes have run. A single pass
//! ([`ExpansionSession::parse_text`]):
//!
//! 1. tokenizes the current text,
//! 2. dispatches every directive to its resolver, in tokenizer order and one at
//!    a time (resolvers may prompt the user, so dispatch is never concurrent),
//! 3. replaces the first occurrence of each directive's raw text with the
//!    resolved value.
//!
//! Resolved values may contain further directives; they are picked up by the
//! next pass. A resolver that keeps reinserting directives is cut off at the
//! ceiling and the partially expanded text is returned.
//!
//! # Failures
//!
//! Resolver errors never abort an expansion. They are logged, shown through the
//! [`Prompter`](crate::host::Prompter) and the directive resolves to empty text
//! (or to a diagnostic string when the configuration enables debug output).

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, trace, warn};

use super::cache::{CacheKey, CachedValue, SessionCache};
use super::registry::{Resolver, ResolverRegistry};
use super::tag::TagKind;
use super::tokenizer::tokenize;
use crate::config::{GlobalConfig, TemplateLibrary};
use crate::core::QuicktextError;
use crate::host::{
    ComposeDetails, ComposeUpdate, ContentMode, HostServices, Insertion, sanitize_html,
};

/// Upper bound on expansion passes for a single [`ExpansionSession::parse`] call.
pub const MAX_PASSES: usize = 20;

/// Result of a full expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The expanded text
    pub text: String,
    /// Number of passes performed, at least 1
    pub passes: usize,
    /// Whether the loop stopped at [`MAX_PASSES`] while the text was still changing
    pub reached_ceiling: bool,
}

/// State for one insertion action.
pub struct ExpansionSession {
    registry: Arc<ResolverRegistry>,
    cache: SessionCache,
    host: HostServices,
    templates: Arc<TemplateLibrary>,
    config: Arc<GlobalConfig>,
    force_as_text: bool,
    details: Option<ComposeDetails>,
    timestamp: Option<DateTime<Local>>,
}

impl std::fmt::Debug for ExpansionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionSession")
            .field("cache_entries", &self.cache.len())
            .field("force_as_text", &self.force_as_text)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl ExpansionSession {
    /// Create a session with an empty cache, an empty template library and the
    /// default configuration.
    pub fn new(registry: Arc<ResolverRegistry>, host: HostServices) -> Self {
        Self {
            registry,
            cache: SessionCache::new(),
            host,
            templates: Arc::new(TemplateLibrary::default()),
            config: Arc::new(GlobalConfig::default()),
            force_as_text: false,
            details: None,
            timestamp: None,
        }
    }

    /// Use `templates` for `TEXT` and `SCRIPT` lookups.
    #[must_use]
    pub fn with_templates(mut self, templates: Arc<TemplateLibrary>) -> Self {
        self.templates = templates;
        self
    }

    /// Use `config` for date formats, debug output and request/script settings.
    #[must_use]
    pub fn with_config(mut self, config: Arc<GlobalConfig>) -> Self {
        self.config = config;
        self
    }

    /// Seed the cache, typically with [`SessionCache::persistent_snapshot`] of a
    /// previous session so persistent values carry over.
    #[must_use]
    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = cache;
        self
    }

    /// Start with text insertion forced regardless of the editor mode.
    #[must_use]
    pub fn with_force_as_text(mut self, force: bool) -> Self {
        self.force_as_text = force;
        self
    }

    /// Pin the session timestamp used by `DATE` and `TIME`.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Expand `text` to a fixed point and return the expanded text.
    ///
    /// # Errors
    ///
    /// Fails only when a host collaborator fails outside of a resolver, for
    /// example when an alert cannot be shown.
    pub async fn parse(&mut self, text: &str) -> Result<String> {
        Ok(self.parse_with_report(text).await?.text)
    }

    /// Expand `text` to a fixed point and report how many passes it took.
    pub async fn parse_with_report(&mut self, text: &str) -> Result<Expansion> {
        let mut current = text.to_string();
        let mut passes = 0;

        loop {
            passes += 1;
            let next = self.parse_text(&current).await.map_err(|error| {
                anyhow::Error::new(QuicktextError::Expansion {
                    reason: format!("{error:#}"),
                })
            })?;
            let changed = next != current;
            current = next;

            if !changed {
                debug!("Expansion reached a fixed point after {} pass(es)", passes);
                return Ok(Expansion {
                    text: current,
                    passes,
                    reached_ceiling: false,
                });
            }

            if passes >= MAX_PASSES {
                warn!("Expansion stopped after {} passes; text is still changing", MAX_PASSES);
                return Ok(Expansion {
                    text: current,
                    passes,
                    reached_ceiling: true,
                });
            }
        }
    }

    /// Run a single expansion pass over `text`.
    pub async fn parse_text(&mut self, text: &str) -> Result<String> {
        let directives = tokenize(text);
        if directives.is_empty() {
            return Ok(text.to_string());
        }

        debug!("Pass found {} directive(s)", directives.len());
        let mut output = text.to_string();
        for directive in &directives {
            let value = self.dispatch(directive.tag, &directive.arguments).await?;
            trace!("{} -> {:?}", directive.raw, value);
            output = output.replacen(&directive.raw, &value, 1);
        }
        Ok(output)
    }

    /// Resolve one directive to its replacement text.
    ///
    /// Unregistered tags and directives with too few arguments resolve to empty
    /// text without invoking a resolver. Resolver failures are reported and
    /// also resolve to empty text.
    pub async fn dispatch(&mut self, tag: TagKind, arguments: &[String]) -> Result<String> {
        let Some(resolver) = self.registry.admit(tag, arguments.len()) else {
            return Ok(String::new());
        };

        debug!("Dispatching {} with {} argument(s)", tag, arguments.len());
        let outcome = self.compute_with(&resolver, tag, arguments).await;
        match outcome {
            Ok(value) => Ok(resolver.render(&value, arguments)),
            Err(error) => self.report_failure(tag, error).await,
        }
    }

    /// Fetch the data behind `tag` for `arguments`, through the session cache.
    ///
    /// This is how resolvers consume other tags' data: the URL resolver posts
    /// recipient data by calling `get_or_compute(TagKind::To, &[])`. The
    /// argument minimum is not enforced here, only by [`dispatch`](Self::dispatch).
    pub async fn get_or_compute(&mut self, tag: TagKind, arguments: &[String]) -> Result<CachedValue> {
        let resolver = self
            .registry
            .entry(tag)
            .map(|entry| Arc::clone(&entry.resolver))
            .ok_or_else(|| QuicktextError::Other {
                message: format!("No resolver registered for {tag}"),
            })?;
        self.compute_with(&resolver, tag, arguments).await
    }

    async fn compute_with(
        &mut self,
        resolver: &Arc<dyn Resolver>,
        tag: TagKind,
        arguments: &[String],
    ) -> Result<CachedValue> {
        let key = CacheKey::for_scope(tag, &resolver.scope(arguments));
        if let Some(value) = key.as_ref().and_then(|key| self.cache.lookup(key)) {
            trace!("Cache hit for {}", tag);
            return Ok(value.clone());
        }

        let value = resolver.fetch(arguments, self).await?;
        if let Some(key) = key {
            self.cache.record(key, value.clone());
        }
        Ok(value)
    }

    /// Report a resolver failure to the user and produce the replacement text.
    pub async fn report_failure(&mut self, tag: TagKind, error: anyhow::Error) -> Result<String> {
        warn!("{} directive failed: {:#}", tag, error);

        let message = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<QuicktextError>())
            .map_or_else(|| format!("{error:#}"), QuicktextError::alert_message);

        self.host
            .prompter
            .alert(&message)
            .await
            .with_context(|| format!("Failed to report the {tag} failure"))?;

        if self.config.debug {
            Ok(format!("Quicktext error in {tag}: {message}"))
        } else {
            Ok(String::new())
        }
    }

    /// Drop transient cached data and the cached compose details.
    ///
    /// Persistent values (counter, version, original message data) are kept.
    pub fn reset_data(&mut self) {
        self.cache.clear_transient();
        self.details = None;
        self.timestamp = None;
    }

    /// Drop every cached value, persistent ones included.
    pub fn clear_data(&mut self) {
        self.cache.clear_all();
        self.details = None;
        self.timestamp = None;
    }

    /// Compose details, fetched from the host once and cached until
    /// [`set_details`](Self::set_details) is called.
    pub async fn details(&mut self) -> Result<ComposeDetails> {
        if let Some(details) = &self.details {
            return Ok(details.clone());
        }
        let details = self
            .host
            .compose
            .details()
            .await
            .context("Failed to read compose details")?;
        self.details = Some(details.clone());
        Ok(details)
    }

    /// Update one compose field and invalidate the cached details.
    pub async fn set_details(&mut self, update: ComposeUpdate) -> Result<()> {
        self.host
            .compose
            .set_details(update)
            .await
            .context("Failed to update compose details")?;
        self.details = None;
        Ok(())
    }

    /// How content will be inserted: plain text when the editor is in plain-text
    /// mode or text insertion has been forced.
    pub async fn insert_type(&mut self) -> Result<ContentMode> {
        let details = self.details().await?;
        if details.is_plain_text || self.force_as_text {
            Ok(ContentMode::PlainText)
        } else {
            Ok(ContentMode::RichText)
        }
    }

    /// Hand expanded content to the insertion sink. Rich content is sanitized first.
    pub async fn insert_body(&mut self, text: &str, extra_space: bool) -> Result<()> {
        let mode = self.insert_type().await?;
        let content = match mode {
            ContentMode::PlainText => text.to_string(),
            ContentMode::RichText => sanitize_html(text),
        };
        debug!("Inserting {} byte(s) as {}", content.len(), mode);
        self.host
            .sink
            .insert(Insertion {
                content,
                mode,
                extra_space,
            })
            .await
            .context("Failed to insert expanded content")
    }

    /// Force text insertion for the rest of the session.
    pub fn force_text_mode(&mut self) {
        self.force_as_text = true;
    }

    /// Whether text insertion has been forced.
    #[must_use]
    pub fn is_forced_as_text(&self) -> bool {
        self.force_as_text
    }

    /// The session timestamp shared by `DATE` and `TIME`.
    pub fn timestamp(&mut self) -> DateTime<Local> {
        *self.timestamp.get_or_insert_with(Local::now)
    }

    /// Host collaborators.
    #[must_use]
    pub fn host(&self) -> &HostServices {
        &self.host
    }

    /// Template library.
    #[must_use]
    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The session cache.
    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Consume the session and return its cache.
    #[must_use]
    pub fn into_cache(self) -> SessionCache {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::engine::cache::CacheScope;
    use crate::test_utils::{RecordingPrompter, memory_host};

    struct Echo;

    #[async_trait]
    impl Resolver for Echo {
        fn scope(&self, _arguments: &[String]) -> CacheScope {
            CacheScope::Uncached
        }

        async fn fetch(&self, arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
            Ok(CachedValue::Text(arguments.join("+")))
        }
    }

    struct Failing;

    #[async_trait]
    impl Resolver for Failing {
        async fn fetch(&self, _arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
            Err(QuicktextError::UrlRequest {
                url: "http://x".into(),
                reason: "connection refused".into(),
            }
            .into())
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Resolver for Counting {
        async fn fetch(&self, _arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
            Ok(CachedValue::Number(self.0.fetch_add(1, Ordering::SeqCst) as u64 + 1))
        }
    }

    fn session(registry: ResolverRegistry) -> (ExpansionSession, Arc<RecordingPrompter>) {
        let (host, prompter) = memory_host(ComposeDetails::default());
        (ExpansionSession::new(Arc::new(registry), host), prompter)
    }

    #[tokio::test]
    async fn test_zero_directives_is_one_pass() {
        let (mut session, _) = session(ResolverRegistry::new());
        let report = session.parse_with_report("nothing to do").await.unwrap();
        assert_eq!(report.text, "nothing to do");
        assert_eq!(report.passes, 1);
        assert!(!report.reached_ceiling);
    }

    #[tokio::test]
    async fn test_unregistered_tag_resolves_to_empty() {
        let (mut session, _) = session(ResolverRegistry::new());
        assert_eq!(session.parse("a[[SUBJECT]]b").await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_nested_output_is_expanded_in_later_pass() {
        let mut registry = ResolverRegistry::new();
        registry.register(TagKind::Text, 2, Echo);
        registry.register(TagKind::Subject, 0, Echo);
        let (mut session, _) = session(registry);

        let report = session
            .parse_with_report("[[TEXT=[[SUBJECT=x]]|y]]")
            .await
            .unwrap();
        assert_eq!(report.text, "x+y");
        assert_eq!(report.passes, 3);
    }

    #[tokio::test]
    async fn test_failure_is_alerted_and_empty() {
        let mut registry = ResolverRegistry::new();
        registry.register(TagKind::Url, 1, Failing);
        let (mut session, prompter) = session(registry);

        let text = session.parse("<[[URL=http://x]]>").await.unwrap();
        assert_eq!(text, "<>");
        assert_eq!(prompter.alerts().len(), 1);
        assert!(prompter.alerts()[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_failure_renders_debug_string_when_enabled() {
        let mut registry = ResolverRegistry::new();
        registry.register(TagKind::Url, 1, Failing);
        let (session, _) = session(registry);
        let config = GlobalConfig {
            debug: true,
            ..Default::default()
        };
        let mut session = session.with_config(Arc::new(config));

        let text = session.parse("[[URL=http://x]]").await.unwrap();
        assert!(text.starts_with("Quicktext error in URL: "));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let mut registry = ResolverRegistry::new();
        registry.register(TagKind::Url, 1, Failing);
        let (mut session, _) = session(registry);
        session.parse("[[URL=http://x]]").await.unwrap();
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn test_reset_keeps_persistent_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ResolverRegistry::new();
        registry.register(TagKind::Counter, 0, Counting(Arc::clone(&calls)));
        registry.register(TagKind::Subject, 0, Counting(Arc::clone(&calls)));
        let (mut session, _) = session(registry);

        assert_eq!(session.parse("[[COUNTER]] [[SUBJECT]]").await.unwrap(), "1 2");
        session.reset_data();
        assert_eq!(session.parse("[[COUNTER]] [[SUBJECT]]").await.unwrap(), "1 3");
        session.clear_data();
        assert_eq!(session.parse("[[COUNTER]]").await.unwrap(), "4");
    }

    #[tokio::test]
    async fn test_insert_type_follows_force_flag() {
        let (mut session, _) = session(ResolverRegistry::new());
        assert_eq!(session.insert_type().await.unwrap(), ContentMode::RichText);
        session.force_text_mode();
        assert_eq!(session.insert_type().await.unwrap(), ContentMode::PlainText);
    }
}
