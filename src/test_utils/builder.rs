//! Session builder for simplified test setup
//!
//! [`TestSession`] wires a [`StaticComposeHost`] over an editable
//! [`ComposeContext`], the standard resolver registry and recording
//! collaborators into an [`ExpansionSession`].

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};

use super::host::{RecordingPrompter, RecordingSink};
use crate::config::{GlobalConfig, TemplateLibrary};
use crate::engine::{ExpansionSession, ResolverRegistry};
use crate::host::{ComposeContext, ComposeDetails, HostServices, KeyValueStore, MemoryStore, StaticComposeHost};

/// A builder for expansion sessions with a fluent API
pub struct TestSession {
    /// Compose state served to the session. Changes made after
    /// [`compose_host`](Self::compose_host) has been called are not seen.
    pub context: ComposeContext,
    config: GlobalConfig,
    templates: TemplateLibrary,
    store: Arc<dyn KeyValueStore>,
    prompter: Arc<RecordingPrompter>,
    sink: Arc<RecordingSink>,
    timestamp: Option<DateTime<Local>>,
    compose: OnceLock<Arc<StaticComposeHost>>,
}

impl TestSession {
    /// Start from `details` and an otherwise empty compose context
    pub fn new(details: ComposeDetails) -> Self {
        Self {
            context: ComposeContext {
                details,
                ..Default::default()
            },
            config: GlobalConfig::default(),
            templates: TemplateLibrary::default(),
            store: Arc::new(MemoryStore::new()),
            prompter: Arc::new(RecordingPrompter::new()),
            sink: Arc::new(RecordingSink::default()),
            timestamp: None,
            compose: OnceLock::new(),
        }
    }

    /// Use `config` for the session and for building the registry
    pub fn with_config(mut self, config: GlobalConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `templates` as the template library
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    /// Share `store` with the session, e.g. to inspect the counter afterwards
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    /// Pin the session timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The prompter the session will use
    pub fn prompter(&self) -> Arc<RecordingPrompter> {
        Arc::clone(&self.prompter)
    }

    /// The sink the session will insert into
    pub fn sink(&self) -> Arc<RecordingSink> {
        Arc::clone(&self.sink)
    }

    /// The compose host the session will talk to. Freezes [`context`](Self::context).
    pub fn compose_host(&self) -> Arc<StaticComposeHost> {
        Arc::clone(self.compose.get_or_init(|| Arc::new(StaticComposeHost::new(self.context.clone()))))
    }

    /// Host services for the session
    pub fn services(&self) -> HostServices {
        HostServices {
            compose: self.compose_host(),
            prompter: self.prompter(),
            store: Arc::clone(&self.store),
            sink: self.sink(),
        }
    }

    /// Build the session with the standard resolver registry
    pub fn build(self) -> ExpansionSession {
        let registry = ResolverRegistry::standard(&self.config);
        let session = ExpansionSession::new(Arc::new(registry), self.services())
            .with_templates(Arc::new(self.templates))
            .with_config(Arc::new(self.config));
        match self.timestamp {
            Some(timestamp) => session.with_timestamp(timestamp),
            None => session,
        }
    }
}
