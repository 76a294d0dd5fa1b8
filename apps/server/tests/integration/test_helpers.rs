//! Shared fixtures for the integration tests.

use std::sync::Arc;

use buildlens_lib::config::{CacheSettings, PrSettings};
use buildlens_lib::services::{BuildResults, MemoryStore, ResultCache};

/// PR prefix used by every fixture.
pub const PULL_PREFIX: &str = "/ci/pr-logs/pull";

pub fn pr_settings() -> PrSettings {
    PrSettings {
        pull_prefix: PULL_PREFIX.to_string(),
        default_org: "kubernetes".to_string(),
        default_repo: "kubernetes".to_string(),
    }
}

pub fn started_json(timestamp: i64) -> String {
    format!(r#"{{"timestamp": {}}}"#, timestamp)
}

pub fn finished_json(result: &str) -> String {
    format!(r#"{{"timestamp": 1500000100, "result": "{}"}}"#, result)
}

/// Write the markers of one build. `None` leaves a marker out.
pub fn seed_build(
    store: &MemoryStore,
    build_dir: &str,
    started: Option<&str>,
    finished: Option<&str>,
) {
    if let Some(started) = started {
        store.insert(format!("{}/started.json", build_dir), started);
    }
    if let Some(finished) = finished {
        store.insert(format!("{}/finished.json", build_dir), finished);
    }
}

/// A finished, successful build started at `timestamp`.
pub fn seed_passing_build(store: &MemoryStore, build_dir: &str, timestamp: i64) {
    seed_build(
        store,
        build_dir,
        Some(&started_json(timestamp)),
        Some(&finished_json("SUCCESS")),
    );
}

/// A JUnit document with one suite and the given `(name, failure)` cases.
pub fn junit(cases: &[(&str, Option<&str>)]) -> String {
    let body: String = cases
        .iter()
        .map(|(name, failure)| match failure {
            Some(text) => format!(
                r#"<testcase name="{}" time="2.5"><failure>{}</failure></testcase>"#,
                name, text
            ),
            None => format!(r#"<testcase name="{}" time="0.1"/>"#, name),
        })
        .collect();
    format!("<testsuite>{}</testsuite>", body)
}

/// Cached result service over `store`.
pub fn results_for(store: Arc<MemoryStore>) -> BuildResults {
    BuildResults::new(
        store,
        ResultCache::new(1_000),
        CacheSettings::default(),
        pr_settings(),
    )
}
