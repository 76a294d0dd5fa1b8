//! HTTP endpoints over an in-memory bucket.

use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use buildlens_lib::api;
use buildlens_lib::services::MemoryStore;
use serde_json::Value;

use super::test_helpers::*;

/// Bucket with one failed periodic build and one PR build.
fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed_build(
        &store,
        "/ci/logs/e2e-gce/5",
        Some(&started_json(1_500_000_000)),
        Some(&finished_json("FAILURE")),
    );
    store.insert(
        "/ci/logs/e2e-gce/5/artifacts/junit_01.xml",
        junit(&[("ok-test", None), ("flaky-test", Some("timeout waiting"))]),
    );
    seed_passing_build(&store, "/ci/logs/e2e-gce/4", 1_499_999_000);
    seed_passing_build(&store, "/ci/logs/unit/9", 1_500_000_000);
    seed_passing_build(
        &store,
        &format!("{}/12/pull-e2e/7", PULL_PREFIX),
        1_500_000_000,
    );
    store
}

#[actix_rt::test]
async fn test_health() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["listed"], PULL_PREFIX);
    assert_eq!(body["cache_enabled"], true);
}

#[actix_rt::test]
async fn test_get_build() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/build/ci/logs/e2e-gce/5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["job"], "e2e-gce");
    assert_eq!(body["build"], "5");
    assert_eq!(body["details"]["build_dir"], "/ci/logs/e2e-gce/5");
    assert_eq!(body["details"]["finished"]["result"], "FAILURE");
    assert_eq!(body["details"]["results"]["passed"][0], "ok-test");
    assert_eq!(body["details"]["results"]["failed"][0]["name"], "flaky-test");
    assert!(body["pr"].is_null());
}

#[actix_rt::test]
async fn test_get_missing_build() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/build/ci/logs/e2e-gce/404")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_invalid_paths_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    for uri in [
        "/api/v1/build/e2e-gce/5",
        "/api/v1/pr/abc",
        "/api/v1/pr/a/b/c/12",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_INPUT");
    }
}

#[actix_rt::test]
async fn test_list_builds() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/builds/ci/logs/e2e-gce")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["job_dir"], "/ci/logs/e2e-gce");
    let ids: Vec<&str> = body["builds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["5", "4"]);
    assert_eq!(body["next_before"], "4");

    let req = test::TestRequest::get()
        .uri("/api/v1/builds/ci/logs/e2e-gce?before=5")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["builds"].as_array().unwrap().len(), 1);
    assert_eq!(body["builds"][0]["id"], "4");
}

#[actix_rt::test]
async fn test_list_jobs() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/jobs/ci/logs").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let jobs: Vec<&str> = body["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["path"].as_str().unwrap())
        .collect();
    assert_eq!(jobs, vec!["/ci/logs/e2e-gce/", "/ci/logs/unit/"]);
}

#[actix_rt::test]
async fn test_get_pr() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(seeded_store())))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/pr/12").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pr"]["number"], "12");
    assert_eq!(body["pr"]["repo"], "kubernetes/kubernetes");
    assert_eq!(body["table"]["max_builds"], 1);
    assert_eq!(body["table"]["rows"][0]["job"], "pull-e2e");
    assert_eq!(body["table"]["rows"][0]["cells"][0]["id"], "7");
}

/// A redirect file under `.../directory/<job>/` leads to the real build.
#[actix_rt::test]
async fn test_directory_pointer_followed() {
    let store = seeded_store();
    store.insert(
        "/ci/pr-logs/directory/pull-e2e/7.txt",
        "gs://ci/pr-logs/pull/12/pull-e2e/7\n",
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(results_for(store)))
            .configure(api::configure_api),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/build/ci/pr-logs/directory/pull-e2e/7")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"]["build_dir"], "/ci/pr-logs/pull/12/pull-e2e/7");
    assert_eq!(body["details"]["finished"]["result"], "SUCCESS");
}
