//! Build log lookup: uploaded log first, then the live controller.

use std::sync::Arc;

use buildlens_lib::services::{LiveLogClient, MemoryStore};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::test_helpers::*;

const RUNNING_LOG: &str = "cloning\nbuilding\nrunning tests\n";

async fn controller_with_log(job: &str, id: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/log"))
        .and(query_param("job", job))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[actix_rt::test]
async fn test_fetch_log_digests_body() {
    let server = controller_with_log("pull-e2e", "7", RUNNING_LOG).await;
    let client = LiveLogClient::new(&server.uri()).unwrap();

    let log = client.fetch_log("pull-e2e", "7").await.expect("log served");

    assert_eq!(log.digest, "cloning\nbuilding\nrunning tests");
    assert_eq!(
        log.source_url.as_deref(),
        Some(format!("{}/log?job=pull-e2e&id=7", server.uri()).as_str())
    );
}

#[actix_rt::test]
async fn test_fetch_log_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/log"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = LiveLogClient::new(&server.uri()).unwrap();

    assert!(client.fetch_log("pull-e2e", "7").await.is_none());
}

#[actix_rt::test]
async fn test_fetch_log_unreachable_is_none() {
    let client = LiveLogClient::new("http://127.0.0.1:1").unwrap();
    assert!(client.fetch_log("pull-e2e", "7").await.is_none());
}

/// A running build without an uploaded log falls back to the controller.
#[actix_rt::test]
async fn test_build_view_uses_live_log_for_running_build() {
    let server = controller_with_log("pull-e2e", "7", RUNNING_LOG).await;
    let store = Arc::new(MemoryStore::new());
    seed_build(
        &store,
        &format!("{}/12/pull-e2e/7", PULL_PREFIX),
        Some(&started_json(1_500_000_000)),
        None,
    );
    let results = results_for(store).with_live_log(LiveLogClient::new(&server.uri()).unwrap());

    let view = results
        .build_view("ci/pr-logs/pull/12", "pull-e2e", "7", false)
        .await
        .unwrap();

    let log = view.log.expect("live log attached");
    assert!(log.digest.contains("running tests"));
    assert!(log.source_url.is_some());
    let pr = view.pr.expect("PR build");
    assert_eq!(pr.number, "12");
    assert_eq!(pr.repo, "kubernetes/kubernetes");
}

/// The uploaded log wins and the controller is never asked.
#[actix_rt::test]
async fn test_uploaded_log_preferred() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("live"))
        .expect(0)
        .mount(&server)
        .await;

    let build_dir = "/ci/logs/e2e-gce/5";
    let store = Arc::new(MemoryStore::new());
    seed_build(
        &store,
        build_dir,
        Some(&started_json(1_500_000_000)),
        Some(&finished_json("FAILURE")),
    );
    store.insert(
        format!("{}/build-log.txt", build_dir),
        "step 1\nstep 2\nERROR: disk full\n",
    );
    let results = results_for(store).with_live_log(LiveLogClient::new(&server.uri()).unwrap());

    let view = results
        .build_view("ci/logs", "e2e-gce", "5", false)
        .await
        .unwrap();

    let log = view.log.expect("stored log attached");
    assert_eq!(log.digest, "step 1\nstep 2\nERROR: disk full");
    assert!(log.source_url.is_none());
    assert!(view.pr.is_none());
}

/// Passing builds skip the log unless asked for.
#[actix_rt::test]
async fn test_passing_build_log_on_request() {
    let build_dir = "/ci/logs/e2e-gce/6";
    let store = Arc::new(MemoryStore::new());
    seed_passing_build(&store, build_dir, 1_500_000_000);
    store.insert(format!("{}/build-log.txt", build_dir), "all good\n");
    let results = results_for(store);

    let view = results.build_view("ci/logs", "e2e-gce", "6", false).await.unwrap();
    assert!(view.log.is_none());

    let view = results.build_view("ci/logs", "e2e-gce", "6", true).await.unwrap();
    assert_eq!(view.log.map(|l| l.digest), Some("all good".to_string()));
}

/// A log uploaded after the first view shows up on the next one.
#[actix_rt::test]
async fn test_late_uploaded_log_is_picked_up() {
    let build_dir = "/ci/logs/e2e-gce/8";
    let store = Arc::new(MemoryStore::new());
    seed_build(&store, build_dir, Some(&started_json(1_500_000_000)), None);
    let results = results_for(store.clone());

    let view = results.build_view("ci/logs", "e2e-gce", "8", true).await.unwrap();
    assert!(view.log.is_none());

    store.insert(format!("{}/build-log.txt", build_dir), "ERROR: uploaded now\n");
    let view = results.build_view("ci/logs", "e2e-gce", "8", true).await.unwrap();
    assert_eq!(
        view.log.map(|l| l.digest),
        Some("ERROR: uploaded now".to_string())
    );
}
