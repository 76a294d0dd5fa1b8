//! Build list construction: enumeration, pointer resolution and filtering.

use std::sync::Arc;

use buildlens_lib::services::MemoryStore;
use buildlens_lib::services::build_list::build_list;

use super::test_helpers::*;

const JOB_DIR: &str = "/ci/logs/e2e-gce";

fn ids(builds: &[buildlens_lib::models::BuildRecord]) -> Vec<&str> {
    builds.iter().map(|b| b.id.as_str()).collect()
}

#[actix_rt::test]
async fn test_fast_path_lists_newest_first() {
    let store = MemoryStore::new();
    store.insert(format!("{}/latest-build.txt", JOB_DIR), "3");
    for n in 1..=3 {
        seed_passing_build(&store, &format!("{}/{}", JOB_DIR, n), 1_500_000_000 + n);
    }
    // Started after the pointer was written
    seed_build(&store, &format!("{}/4", JOB_DIR), Some(&started_json(1_500_000_004)), None);

    let builds = build_list(&store, JOB_DIR, None).await.unwrap();

    assert_eq!(ids(&builds), vec!["4", "3", "2", "1"]);
    assert!(builds[0].finished.is_none());
    assert_eq!(builds[1].location, format!("{}/3", JOB_DIR));
    assert_eq!(store.list_count(), 0);
}

/// Enumerated ids without markers are dropped, order is kept.
#[actix_rt::test]
async fn test_missing_builds_filtered() {
    let store = MemoryStore::new();
    store.insert(format!("{}/latest-build.txt", JOB_DIR), "5");
    seed_passing_build(&store, &format!("{}/5", JOB_DIR), 1_500_000_005);
    seed_passing_build(&store, &format!("{}/2", JOB_DIR), 1_500_000_002);

    let builds = build_list(&store, JOB_DIR, None).await.unwrap();
    assert_eq!(ids(&builds), vec!["5", "2"]);
}

#[actix_rt::test]
async fn test_before_paginates_with_listing() {
    let store = MemoryStore::new();
    store.insert(format!("{}/latest-build.txt", JOB_DIR), "12");
    for n in 1..=12 {
        seed_passing_build(&store, &format!("{}/{}", JOB_DIR, n), 1_500_000_000 + n);
    }

    let builds = build_list(&store, JOB_DIR, Some("10")).await.unwrap();

    assert_eq!(ids(&builds), vec!["9", "8", "7", "6", "5", "4", "3", "2", "1"]);
    assert!(store.list_count() > 0);
}

/// A build whose marker is malformed is dropped; its siblings still list.
#[actix_rt::test]
async fn test_malformed_sibling_skipped() {
    let store = MemoryStore::new();
    seed_passing_build(&store, &format!("{}/2", JOB_DIR), 1_500_000_002);
    seed_build(&store, &format!("{}/3", JOB_DIR), Some("not json"), None);
    seed_passing_build(&store, &format!("{}/4", JOB_DIR), 1_500_000_004);

    let builds = build_list(&store, JOB_DIR, None).await.unwrap();
    assert_eq!(ids(&builds), vec!["4", "2"]);
}

/// Indirect job directories hold `<id>.txt` pointers to the real build.
#[actix_rt::test]
async fn test_indirect_pointers_resolved() {
    let store = MemoryStore::new();
    let job_dir = "/ci/pr-logs/directory/pull-e2e";
    store.insert(format!("{}/7.txt", job_dir), "gs://ci/pr-logs/pull/12/pull-e2e/7\n");
    store.insert(format!("{}/8.txt", job_dir), "https://elsewhere.example/8");
    store.insert(format!("{}/9.txt", job_dir), "s3://ci/pr-logs/pull/13/pull-e2e/9");
    store.insert(format!("{}/notes.md", job_dir), "ignored");
    seed_passing_build(&store, "/ci/pr-logs/pull/12/pull-e2e/7", 1_500_000_007);
    seed_passing_build(&store, "/ci/pr-logs/pull/13/pull-e2e/9", 1_500_000_009);

    let builds = build_list(&store, job_dir, None).await.unwrap();

    assert_eq!(ids(&builds), vec!["9", "7"]);
    assert_eq!(builds[1].location, "/ci/pr-logs/pull/12/pull-e2e/7");
}

/// Cached by `(job_dir, before)`: a different cursor is a different entry.
#[actix_rt::test]
async fn test_build_list_cache_keyed_by_cursor() {
    let store = Arc::new(MemoryStore::new());
    for n in 1..=3 {
        seed_passing_build(&store, &format!("{}/{}", JOB_DIR, n), 1_500_000_000 + n);
    }
    let results = results_for(store.clone());

    let all = results.build_list(JOB_DIR, None).await.unwrap();
    let reads = store.read_count();
    let again = results.build_list(JOB_DIR, None).await.unwrap();
    assert_eq!(all, again);
    assert_eq!(store.read_count(), reads);

    let older = results.build_list(JOB_DIR, Some("3")).await.unwrap();
    assert_eq!(ids(&older), vec!["2", "1"]);
    assert!(store.read_count() > reads);
}
