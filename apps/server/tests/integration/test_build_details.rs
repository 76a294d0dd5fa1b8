//! Build detail resolution against an in-memory bucket.

use std::sync::Arc;

use buildlens_lib::error::AppError;
use buildlens_lib::services::MemoryStore;
use buildlens_lib::services::build_details::build_details;

use super::test_helpers::*;

const BUILD_DIR: &str = "/ci/logs/e2e-gce/5";

/// A build with only a started marker resolves with `finished = None`.
#[actix_rt::test]
async fn test_started_only_build_resolves() {
    let store = MemoryStore::new();
    seed_build(&store, BUILD_DIR, Some(&started_json(1_500_000_000)), None);
    store.insert(
        format!("{}/artifacts/junit_01.xml", BUILD_DIR),
        junit(&[("testcaseA", None)]),
    );

    let details = build_details(&store, BUILD_DIR)
        .await
        .unwrap()
        .expect("build should exist");

    assert_eq!(details.started.unwrap().timestamp(), Some(1_500_000_000));
    assert!(details.finished.is_none());
    assert_eq!(details.results.passed, vec!["testcaseA"]);
}

#[actix_rt::test]
async fn test_missing_build_is_none() {
    let store = MemoryStore::new();
    store.insert(format!("{}/artifacts/junit_01.xml", BUILD_DIR), junit(&[]));

    assert!(build_details(&store, BUILD_DIR).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_malformed_marker_is_error() {
    let store = MemoryStore::new();
    seed_build(&store, BUILD_DIR, Some("{\"timestamp\": "), None);

    let err = build_details(&store, BUILD_DIR).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedMetadata { .. }));
}

/// Every `junit_*.xml` report is merged; other artifacts are ignored.
#[actix_rt::test]
async fn test_reports_merged() {
    let store = MemoryStore::new();
    seed_build(
        &store,
        BUILD_DIR,
        Some(&started_json(1_500_000_000)),
        Some(&finished_json("FAILURE")),
    );
    store.insert(
        format!("{}/artifacts/junit_01.xml", BUILD_DIR),
        junit(&[("b-test", None), ("a-test", Some("boom"))]),
    );
    store.insert(
        format!("{}/artifacts/junit_02.xml", BUILD_DIR),
        junit(&[("c-test", None)]),
    );
    store.insert(
        format!("{}/artifacts/results.xml", BUILD_DIR),
        junit(&[("ignored", Some("never read"))]),
    );
    store.insert(
        format!("{}/artifacts/nested/junit_03.xml", BUILD_DIR),
        junit(&[("nested", None)]),
    );

    let details = build_details(&store, BUILD_DIR).await.unwrap().unwrap();

    assert_eq!(details.results.passed, vec!["b-test", "c-test"]);
    assert_eq!(details.results.failed.len(), 1);
    let failed = &details.results.failed[0];
    assert_eq!(failed.name, "a-test");
    assert_eq!(failed.duration, 2.5);
    assert_eq!(failed.text, "boom");
    assert_eq!(failed.source, format!("{}/artifacts/junit_01.xml", BUILD_DIR));
}

/// A corrupt report surfaces as a synthetic failure, not a resolver error.
#[actix_rt::test]
async fn test_corrupt_report_is_visible_failure() {
    let store = MemoryStore::new();
    seed_passing_build(&store, BUILD_DIR, 1_500_000_000);
    store.insert(
        format!("{}/artifacts/junit_01.xml", BUILD_DIR),
        b"<testsuite><testcase".to_vec(),
    );

    let details = build_details(&store, BUILD_DIR).await.unwrap().unwrap();
    assert_eq!(details.results.failed.len(), 1);
    assert_eq!(
        details.results.failed[0].name,
        buildlens_lib::services::junit::INTERNAL_PARSE_ERROR_NAME
    );
}

#[actix_rt::test]
async fn test_commit_from_version() {
    let store = MemoryStore::new();
    seed_build(
        &store,
        BUILD_DIR,
        Some(r#"{"timestamp": 1, "version": "v1.9.0-alpha.1+abc", "pull": "master:111,42:222"}"#),
        Some(r#"{"result": "SUCCESS", "version": "v1.9.0-alpha.1+def"}"#),
    );

    let details = build_details(&store, BUILD_DIR).await.unwrap().unwrap();
    assert_eq!(details.commit(), Some("def"));
    let refs = details.pull_refs();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[1].name, "42");
    assert_eq!(refs[1].sha, "222");
}

/// Repeated resolution within the TTL is served from the cache.
#[actix_rt::test]
async fn test_build_details_cached() {
    let store = Arc::new(MemoryStore::new());
    seed_passing_build(&store, BUILD_DIR, 1_500_000_000);
    let results = results_for(store.clone());

    let first = results.build_details(BUILD_DIR).await.unwrap();
    let reads = store.read_count();
    let lists = store.list_count();
    let second = results.build_details(BUILD_DIR).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.read_count(), reads);
    assert_eq!(store.list_count(), lists);
}

/// A build that was missing on the first lookup is found once it appears.
#[actix_rt::test]
async fn test_missing_build_not_cached() {
    let store = Arc::new(MemoryStore::new());
    let results = results_for(store.clone());

    assert!(results.build_details(BUILD_DIR).await.unwrap().is_none());

    seed_build(&store, BUILD_DIR, Some(&started_json(1_500_000_000)), None);
    let details = results.build_details(BUILD_DIR).await.unwrap();
    assert!(details.is_some_and(|d| d.started.is_some()));
}
