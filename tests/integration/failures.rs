//! Resolver failures are reported and never abort an expansion.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use quicktext::config::{GlobalConfig, Script, Template, TemplateGroup, TemplateLibrary};
use quicktext::core::QuicktextError;
use quicktext::engine::{CacheScope, CachedValue, ExpansionSession, Resolver, ResolverRegistry, TagKind};
use quicktext::host::ComposeDetails;
use quicktext::test_utils::{CountingResolver, RecordingPrompter, TestSession, memory_host};

/// Fails on every fetch and counts the attempts.
struct Offline {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Resolver for Offline {
    async fn fetch(&self, _arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(QuicktextError::host_call("read subject", "offline").into())
    }
}

fn failing_session(config: GlobalConfig) -> (ExpansionSession, Arc<AtomicUsize>, Arc<RecordingPrompter>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let to = CountingResolver::new(CachedValue::Text("ada@example.com".to_string()))
        .with_scope(CacheScope::Uncached);

    let mut registry = ResolverRegistry::new();
    registry
        .register(
            TagKind::Subject,
            0,
            Offline {
                calls: Arc::clone(&calls),
            },
        )
        .register(TagKind::To, 1, to);

    let (services, prompter) = memory_host(ComposeDetails::default());
    let session = ExpansionSession::new(Arc::new(registry), services).with_config(Arc::new(config));
    (session, calls, prompter)
}

#[tokio::test]
async fn test_failure_resolves_to_empty_and_alerts() {
    let (mut session, calls, prompter) = failing_session(GlobalConfig::default());

    let output = session.parse("<[[SUBJECT]]> for [[TO=email]]").await.unwrap();
    assert_eq!(output, "<> for ada@example.com");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(prompter.alerts(), vec!["Host operation 'read subject' failed: offline"]);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_by_a_later_directive() {
    let (mut session, calls, prompter) = failing_session(GlobalConfig::default());

    assert_eq!(session.parse("[[SUBJECT]][[subject]]").await.unwrap(), "");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(prompter.alerts().len(), 2);
}

#[tokio::test]
async fn test_debug_config_renders_diagnostic() {
    let config = GlobalConfig {
        debug: true,
        ..Default::default()
    };
    let (mut session, _, prompter) = failing_session(config);

    let output = session.parse("[[SUBJECT]]").await.unwrap();
    assert_eq!(output, "Quicktext error in SUBJECT: Host operation 'read subject' failed: offline");
    assert_eq!(prompter.alerts().len(), 1);
}

#[tokio::test]
async fn test_library_lookups_report_missing_entries() {
    let templates = TemplateLibrary {
        groups: vec![TemplateGroup {
            name: "Replies".to_string(),
            texts: vec![Template {
                name: "thanks".to_string(),
                kind: Default::default(),
                body: "Thanks!".to_string(),
            }],
        }],
        scripts: vec![Script {
            name: "hello".to_string(),
            body: "echo hello".to_string(),
        }],
    };
    let builder = TestSession::new(ComposeDetails::default()).with_templates(templates);
    let prompter = builder.prompter();
    let mut session = builder.build();

    let output = session
        .parse("[[TEXT=Replies|thanks]] [[TEXT=Replies|missing]][[SCRIPT=nope]]")
        .await
        .unwrap();
    assert_eq!(output, "Thanks! ");
    assert_eq!(
        prompter.alerts(),
        vec![
            "Template 'missing' not found in group 'Replies'",
            "Script 'nope' was not found in the template library",
        ]
    );
}

#[tokio::test]
async fn test_unreadable_file_alerts_with_path() {
    let builder = TestSession::new(ComposeDetails::default());
    let prompter = builder.prompter();
    let mut session = builder.build();

    let output = session.parse("[[FILE=/nonexistent/quicktext/notes.txt]]done").await.unwrap();
    assert_eq!(output, "done");

    let alerts = prompter.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("/nonexistent/quicktext/notes.txt"), "alert: {}", alerts[0]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_script_error_reports_line() {
    // a missing command on line 2, then a non-zero exit
    let templates = TemplateLibrary {
        groups: Vec::new(),
        scripts: vec![Script {
            name: "fails".to_string(),
            body: "echo start\nquicktext_missing_command_42\nexit 3\n".to_string(),
        }],
    };
    let builder = TestSession::new(ComposeDetails::default()).with_templates(templates);
    let prompter = builder.prompter();
    let mut session = builder.build();

    assert_eq!(session.parse("[[SCRIPT=fails]]").await.unwrap(), "");
    let alerts = prompter.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("Error in script fails\n"), "alert: {}", alerts[0]);
    assert!(alerts[0].ends_with("Line 2: quicktext_missing_command_42"), "alert: {}", alerts[0]);
}
