//! Fixed-point expansion through the public library API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use quicktext::config::{Template, TemplateGroup, TemplateKind, TemplateLibrary};
use quicktext::engine::{
    CacheScope, CachedValue, ExpansionSession, MAX_PASSES, Resolver, ResolverRegistry, TagKind,
    tokenize,
};
use quicktext::host::ComposeDetails;
use quicktext::test_utils::{CountingResolver, RecordingPrompter, TestSession, memory_host};

/// Resolves to its arguments joined with commas, on every dispatch.
struct Echo;

#[async_trait]
impl Resolver for Echo {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
        Ok(CachedValue::Text(arguments.join(",")))
    }
}

/// Resolves to a directive that refers back to itself, so the text never settles.
struct Reinserting {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Resolver for Reinserting {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, _arguments: &[String], _session: &mut ExpansionSession) -> Result<CachedValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CachedValue::Text("[[TEXT=loop|again]]+".to_string()))
    }
}

fn session_with(registry: ResolverRegistry) -> (ExpansionSession, Arc<RecordingPrompter>) {
    let (services, prompter) = memory_host(ComposeDetails::default());
    (ExpansionSession::new(Arc::new(registry), services), prompter)
}

fn text(value: &str) -> CachedValue {
    CachedValue::Text(value.to_string())
}

#[tokio::test]
async fn test_text_without_directives_takes_one_pass() {
    let (mut session, _) = session_with(ResolverRegistry::standard(&Default::default()));
    let input = "Dear team, [see attached] and [[CURSOR]] here.";

    let expansion = session.parse_with_report(input).await.unwrap();
    assert_eq!(expansion.text, input);
    assert_eq!(expansion.passes, 1);
    assert!(!expansion.reached_ceiling);
}

#[tokio::test]
async fn test_unterminated_directive_is_left_alone() {
    assert!(tokenize("[[URL=unterminated").is_empty());

    let mut registry = ResolverRegistry::new();
    let url = CountingResolver::new(text("never"));
    let calls = url.calls();
    registry.register(TagKind::Url, 1, url);
    let (mut session, _) = session_with(registry);

    let expansion = session.parse_with_report("see [[URL=unterminated").await.unwrap();
    assert_eq!(expansion.text, "see [[URL=unterminated");
    assert_eq!(expansion.passes, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_arguments_resolve_to_empty_without_dispatch() {
    let mut registry = ResolverRegistry::new();
    let resolver = CountingResolver::new(text("body"));
    let calls = resolver.calls();
    registry.register(TagKind::Text, 2, resolver);
    let (mut session, _) = session_with(registry);

    assert_eq!(session.parse("a[[TEXT=onlyone]]b").await.unwrap(), "ab");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(session.parse("a[[TEXT=group|name]]b").await.unwrap(), "abodyb");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unregistered_tag_resolves_to_empty() {
    let (mut session, prompter) = session_with(ResolverRegistry::new());
    assert_eq!(session.parse("[[CLIPBOARD]]x[[DATE=long]]").await.unwrap(), "x");
    assert!(prompter.alerts().is_empty());
}

#[tokio::test]
async fn test_nested_directive_resolves_after_its_container() {
    let mut registry = ResolverRegistry::new();
    let to = CountingResolver::new(text("ada@example.com"));
    let to_calls = to.calls();
    registry.register(TagKind::Url, 1, Echo).register(TagKind::To, 1, to);
    let (mut session, _) = session_with(registry);

    let source = "[[URL=http://x|[[TO=email]]]]";
    let first_pass = session.parse_text(source).await.unwrap();
    assert_eq!(first_pass, "http://x,[[TO=email]]");
    assert_eq!(to_calls.load(Ordering::SeqCst), 0);

    let expansion = session.parse_with_report(source).await.unwrap();
    assert_eq!(expansion.text, "http://x,ada@example.com");
    assert_eq!(expansion.passes, 3);
    assert_eq!(to_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_literals_settle_over_several_passes() {
    let mut registry = ResolverRegistry::new();
    let date = CountingResolver::new(text("2024-01-01"));
    let calls = date.calls();
    registry.register(TagKind::Date, 0, date);
    let (mut session, _) = session_with(registry);

    assert_eq!(session.parse_text("[[DATE]] and [[DATE]]").await.unwrap(), "2024-01-01 and [[DATE]]");

    let expansion = session.parse_with_report("[[DATE]] and [[DATE]]").await.unwrap();
    assert_eq!(expansion.text, "2024-01-01 and 2024-01-01");
    assert_eq!(expansion.passes, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_self_reinserting_resolver_stops_at_ceiling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ResolverRegistry::new();
    registry.register(
        TagKind::Text,
        2,
        Reinserting {
            calls: Arc::clone(&calls),
        },
    );
    let (mut session, _) = session_with(registry);

    let expansion = session.parse_with_report("[[TEXT=loop|again]]").await.unwrap();
    assert_eq!(expansion.passes, MAX_PASSES);
    assert_eq!(MAX_PASSES, 20);
    assert!(expansion.reached_ceiling);
    assert_eq!(calls.load(Ordering::SeqCst), 20);
    assert_eq!(expansion.text, format!("[[TEXT=loop|again]]{}", "+".repeat(20)));
}

#[tokio::test]
async fn test_library_template_expands_recursively() {
    let templates = TemplateLibrary {
        groups: vec![TemplateGroup {
            name: "Replies".to_string(),
            texts: vec![
                Template {
                    name: "greet".to_string(),
                    kind: TemplateKind::Text,
                    body: "Hi [[TO=firstname]], [[TEXT=Replies|closing]]".to_string(),
                },
                Template {
                    name: "closing".to_string(),
                    kind: TemplateKind::Html,
                    body: "re: [[SUBJECT]]".to_string(),
                },
            ],
        }],
        scripts: Vec::new(),
    };
    let details = ComposeDetails {
        to: vec!["Ada Lovelace <ada@example.com>".to_string()],
        subject: "Engines".to_string(),
        ..Default::default()
    };
    let mut session = TestSession::new(details).with_templates(templates).build();

    let expansion = session.parse_with_report("[[TEXT=Replies|greet]]!").await.unwrap();
    assert_eq!(expansion.text, "Hi Ada, re: Engines!");
    assert_eq!(expansion.passes, 4);
    assert!(session.is_forced_as_text());
}

#[tokio::test]
async fn test_standard_registry_mixed_template() {
    let details = ComposeDetails {
        to: vec!["Ada Lovelace <ada@example.com>".to_string(), "bob@example.com".to_string()],
        subject: "Engines".to_string(),
        ..Default::default()
    };
    let mut session = TestSession::new(details).build();

    let output = session
        .parse("To: [[TO=email|; ]] ([[to=firstname| and ]]) about [[SUBJECT]][[HEADER=subject|Re: Engines]]")
        .await
        .unwrap();
    assert_eq!(output, "To: ada@example.com; bob@example.com (Ada and ) about Engines");
    assert_eq!(session.details().await.unwrap().subject, "Re: Engines");
}
