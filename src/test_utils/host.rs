//! Recording host collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::engine::{CacheScope, CachedValue, ExpansionSession, Resolver};
use crate::host::{
    ComposeContext, ComposeDetails, HostServices, Insertion, InsertionSink, MemoryStore, Prompter,
    StaticComposeHost,
};

/// A [`Prompter`] that answers from a table and records everything it is asked.
///
/// Labels without a configured answer get the prompt's default value.
#[derive(Debug, Default)]
pub struct RecordingPrompter {
    answers: Mutex<HashMap<String, Option<String>>>,
    prompts: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
}

impl RecordingPrompter {
    /// Create a prompter with no configured answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts labelled `label` with `value`.
    pub fn answer(&self, label: impl Into<String>, value: impl Into<String>) {
        self.answers.lock().unwrap().insert(label.into(), Some(value.into()));
    }

    /// Dismiss prompts labelled `label`.
    pub fn dismiss(&self, label: impl Into<String>) {
        self.answers.lock().unwrap().insert(label.into(), None);
    }

    /// Labels of every prompt shown so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Every alert shown so far.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for RecordingPrompter {
    async fn prompt(&self, label: &str, default: &str) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(label.to_string());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(label)
            .cloned()
            .unwrap_or_else(|| Some(default.to_string())))
    }

    async fn alert(&self, message: &str) -> Result<()> {
        self.alerts.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// An [`InsertionSink`] that keeps every insertion.
#[derive(Debug, Default)]
pub struct RecordingSink {
    insertions: Mutex<Vec<Insertion>>,
}

impl RecordingSink {
    /// Insertions received so far.
    pub fn insertions(&self) -> Vec<Insertion> {
        self.insertions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsertionSink for RecordingSink {
    async fn insert(&self, insertion: Insertion) -> Result<()> {
        self.insertions.lock().unwrap().push(insertion);
        Ok(())
    }
}

/// A resolver that counts its fetches and always produces the same value.
#[derive(Debug, Clone)]
pub struct CountingResolver {
    value: CachedValue,
    scope: CacheScope,
    calls: Arc<AtomicUsize>,
}

impl CountingResolver {
    /// Session-scoped resolver producing `value`.
    pub fn new(value: CachedValue) -> Self {
        Self {
            value,
            scope: CacheScope::PerSession,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use `scope` for every argument list.
    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    /// Shared fetch counter, usable after the resolver moved into a registry.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Resolver for CountingResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        self.scope.clone()
    }

    async fn fetch(&self, _arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }
}

/// Host services over `details` with an in-memory store, a recording sink and
/// a recording prompter, which is returned separately for assertions.
pub fn memory_host(details: ComposeDetails) -> (HostServices, Arc<RecordingPrompter>) {
    let prompter = Arc::new(RecordingPrompter::new());
    let compose = StaticComposeHost::new(ComposeContext {
        details,
        ..Default::default()
    });
    let services = HostServices {
        compose: Arc::new(compose),
        prompter: prompter.clone(),
        store: Arc::new(MemoryStore::new()),
        sink: Arc::new(RecordingSink::default()),
    };
    (services, prompter)
}
