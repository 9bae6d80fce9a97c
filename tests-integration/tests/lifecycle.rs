//! Lifecycle properties of the suite harness and the context registry:
//! shared-context reuse and replacement, eviction by per-suite starts,
//! and fixture scoping at suite vs per-test granularity.

use std::sync::{Arc, Mutex};

use serde_json::json;
use testkit::prelude::*;
use tests_integration::{CountingFactory, RecordingFixture, init_test_logging};

fn fresh_registry() -> Arc<ContextRegistry> {
    Arc::new(ContextRegistry::new())
}

#[tokio::test]
async fn shared_policy_reuses_context_of_same_kind() {
    init_test_logging();
    let registry = fresh_registry();
    let factory = CountingFactory::new("local");

    let mut first = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(factory.clone())
        .shared()
        .build();
    first.start().await.unwrap();
    let first_ctx = Arc::clone(first.context().unwrap());

    let df = first_ctx.session().sql("SELECT 1 AS one").await.unwrap();
    assert_dataframe_eq(df, &[json!({"one": 1})], &CompareOptions::default()).await;

    first.finish().await.unwrap();

    let mut second = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(factory.clone())
        .shared()
        .build();
    second.start().await.unwrap();
    let second_ctx = Arc::clone(second.context().unwrap());
    second.finish().await.unwrap();

    assert!(Arc::ptr_eq(&first_ctx, &second_ctx));
    assert_eq!(factory.builds(), 1);
}

#[tokio::test]
async fn shared_policy_replaces_context_on_kind_change() {
    init_test_logging();
    let registry = fresh_registry();

    let mut first = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(CountingFactory::new("kind_a"))
        .shared()
        .build();
    first.start().await.unwrap();
    let first_ctx = Arc::clone(first.context().unwrap());
    first.finish().await.unwrap();

    // Finishing a shared suite keeps the context alive for reuse
    assert!(!first_ctx.is_stopped());
    assert_eq!(registry.held_kind().await.as_deref(), Some("kind_a"));

    let mut second = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(CountingFactory::new("kind_b"))
        .shared()
        .build();
    second.start().await.unwrap();
    let second_ctx = Arc::clone(second.context().unwrap());
    second.finish().await.unwrap();

    assert!(!Arc::ptr_eq(&first_ctx, &second_ctx));
    assert!(first_ctx.is_stopped());
    assert!(!second_ctx.is_stopped());
    assert_eq!(registry.held_kind().await.as_deref(), Some("kind_b"));
}

#[tokio::test]
async fn per_suite_start_evicts_lingering_shared_context() {
    init_test_logging();
    let registry = fresh_registry();

    let mut shared = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(CountingFactory::new("shared"))
        .shared()
        .build();
    shared.start().await.unwrap();
    let shared_ctx = Arc::clone(shared.context().unwrap());
    shared.finish().await.unwrap();
    assert!(!shared_ctx.is_stopped());

    let mut dedicated = SuiteHarness::builder()
        .registry(Arc::clone(&registry))
        .factory(CountingFactory::new("dedicated"))
        .per_suite()
        .build();
    dedicated.start().await.unwrap();

    // The lingering shared context must be stopped and the slot cleared
    assert!(shared_ctx.is_stopped());
    assert_eq!(registry.held_kind().await, None);

    let dedicated_ctx = Arc::clone(dedicated.context().unwrap());
    dedicated.finish().await.unwrap();
    assert!(dedicated_ctx.is_stopped());
}

#[tokio::test]
async fn fixtures_fire_at_suite_and_test_scope() {
    init_test_logging();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut harness = SuiteHarness::builder()
        .registry(fresh_registry())
        .suite_fixture(RecordingFixture::new("suite", Arc::clone(&log)))
        .test_fixture(RecordingFixture::new("test", Arc::clone(&log)))
        .build();

    harness.start().await.unwrap();
    for _ in 0..2 {
        harness.before_each().await.unwrap();
        harness.after_each().await.unwrap();
    }
    harness.finish().await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "suite:load",
            "test:load",
            "test:unload",
            "test:load",
            "test:unload",
            "suite:unload",
        ]
    );
}

#[tokio::test]
async fn failed_suite_fixture_load_rolls_back_loaded_ones() {
    init_test_logging();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut harness = SuiteHarness::builder()
        .registry(fresh_registry())
        .suite_fixture(RecordingFixture::new("first", Arc::clone(&log)))
        .suite_fixture(RecordingFixture::failing_load("second", Arc::clone(&log)))
        .build();

    let err = harness.start().await.unwrap_err();
    assert!(matches!(err, HarnessError::Fixture(_)));

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first:load", "second:load", "first:unload"]
    );
}

#[tokio::test]
async fn with_fixtures_unloads_on_the_error_path() {
    init_test_logging();
    let log = Arc::new(Mutex::new(Vec::new()));
    let fixtures: Vec<Arc<dyn Fixture>> =
        vec![Arc::new(RecordingFixture::new("scoped", Arc::clone(&log)))];

    let outcome = with_fixtures(&fixtures, async { Err::<(), &str>("boom") })
        .await
        .unwrap();
    assert_eq!(outcome, Err("boom"));

    assert_eq!(*log.lock().unwrap(), vec!["scoped:load", "scoped:unload"]);
}

#[tokio::test]
async fn context_accessor_requires_started_harness() {
    let harness = SuiteHarness::builder().registry(fresh_registry()).build();
    assert!(matches!(
        harness.context(),
        Err(HarnessError::NotStarted)
    ));
}
