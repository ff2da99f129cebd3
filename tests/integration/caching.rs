//! Session cache behavior: memoization, reset semantics and the durable counter.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use quicktext::engine::{CacheKey, CacheScope, CachedValue, ExpansionSession, ResolverRegistry, TagKind};
use quicktext::host::{ComposeDetails, ComposeField, ComposeUpdate, FileStore, KeyValueStore, MemoryStore};
use quicktext::resolvers::COUNTER_KEY;
use quicktext::test_utils::{CountingResolver, TestSession, init_test_logging, memory_host};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinSet;

fn key(tag: TagKind) -> CacheKey {
    CacheKey::for_scope(tag, &CacheScope::PerSession).unwrap()
}

fn counter_session(store: Arc<dyn KeyValueStore>) -> ExpansionSession {
    let details = ComposeDetails {
        subject: "Engines".to_string(),
        ..Default::default()
    };
    TestSession::new(details).with_store(store).build()
}

#[tokio::test]
async fn test_resolver_fetches_once_for_distinct_arguments() {
    let resolver = CountingResolver::new(CachedValue::Text("x".to_string()));
    let calls = resolver.calls();
    let mut registry = ResolverRegistry::new();
    registry.register(TagKind::To, 1, resolver);

    let (services, _) = memory_host(ComposeDetails::default());
    let mut session = ExpansionSession::new(Arc::new(registry), services);

    let output = session.parse("[[TO=email]] [[TO=firstname]] [[TO=lastname|; ]]").await.unwrap();
    assert_eq!(output, "x x x");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (hits, misses) = session.cache().stats();
    assert_eq!((hits, misses), (2, 1));
}

#[tokio::test]
async fn test_input_prompts_once_per_label() {
    let builder = TestSession::new(ComposeDetails::default());
    let prompter = builder.prompter();
    prompter.answer("City", "Paris");
    let mut session = builder.build();

    let output = session.parse("[[INPUT=City]], [[INPUT=City]] [[INPUT=Zip|text|75001]]").await.unwrap();
    assert_eq!(output, "Paris, Paris 75001");
    assert_eq!(prompter.prompts(), vec!["City", "Zip"]);
}

#[tokio::test]
async fn test_counter_increments_once_per_session() {
    init_test_logging(None);
    let store = Arc::new(MemoryStore::new());
    let mut session = counter_session(store.clone());

    assert_eq!(session.parse("#[[COUNTER]] / #[[COUNTER]]").await.unwrap(), "#1 / #1");
    assert_eq!(session.parse("again #[[COUNTER]]").await.unwrap(), "again #1");
    assert_eq!(store.get(COUNTER_KEY).await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_reset_keeps_persistent_entries() {
    let store = Arc::new(MemoryStore::new());
    let mut session = counter_session(store.clone());

    assert_eq!(session.parse("[[COUNTER]] [[SUBJECT]]").await.unwrap(), "1 Engines");
    session
        .set_details(ComposeUpdate {
            field: ComposeField::Subject,
            value: "Gears".to_string(),
        })
        .await
        .unwrap();
    // the fetched subject is memoized until the data is reset
    assert_eq!(session.parse("[[SUBJECT]]").await.unwrap(), "Engines");

    session.reset_data();
    assert!(session.cache().contains(&key(TagKind::Counter)));
    assert!(!session.cache().contains(&key(TagKind::Subject)));
    assert_eq!(session.parse("[[COUNTER]] [[SUBJECT]]").await.unwrap(), "1 Gears");

    session.clear_data();
    assert!(session.cache().is_empty());
    assert_eq!(session.parse("[[COUNTER]]").await.unwrap(), "2");
    assert_eq!(store.get(COUNTER_KEY).await.unwrap(), Some(json!(2)));
}

#[tokio::test]
async fn test_persistent_snapshot_seeds_next_session() {
    let store = Arc::new(MemoryStore::new());
    let mut first = counter_session(store.clone());
    let output = first.parse("[[COUNTER]] [[VERSION=number]]").await.unwrap();
    assert_eq!(output, format!("1 {}", env!("CARGO_PKG_VERSION")));

    let snapshot = first.into_cache().persistent_snapshot();
    assert!(snapshot.contains(&key(TagKind::Version)));

    let mut second = counter_session(store.clone()).with_cache(snapshot);
    assert_eq!(second.parse("[[COUNTER]]").await.unwrap(), "1");

    let mut fresh = counter_session(store.clone());
    assert_eq!(fresh.parse("[[COUNTER]]").await.unwrap(), "2");
}

#[tokio::test]
async fn test_file_store_counter_survives_sessions() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("store.json");

    for expected in ["1", "2", "3"] {
        let mut session = counter_session(Arc::new(FileStore::new(&path)));
        assert_eq!(session.parse("[[COUNTER]]").await.unwrap(), expected);
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let values: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(values[COUNTER_KEY], json!(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_counter_updates_are_not_lost() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let path = path.clone();
        tasks.spawn(async move {
            // one store per task, like separate processes sharing the file
            let store = FileStore::new(path);
            for _ in 0..5 {
                store
                    .update(
                        COUNTER_KEY,
                        Box::new(|current: Option<Value>| {
                            Value::from(current.and_then(|value| value.as_u64()).unwrap_or(0) + 1)
                        }),
                    )
                    .await
                    .unwrap();
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let store = FileStore::new(&path);
    assert_eq!(store.get(COUNTER_KEY).await.unwrap(), Some(json!(40)));
}
