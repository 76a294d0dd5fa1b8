//! Resolution of a single build directory into markers and test results.

use futures_util::future::join_all;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{BuildDetails, BuildMetadata, SuiteResult};
use crate::services::junit::JunitParser;
use crate::services::storage::{ArtifactStore, join_path, read_if_present};

/// Artifact subdirectory holding JUnit reports.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Whether an artifact file name follows the `junit_*.xml` convention.
pub fn is_junit_report(file_name: &str) -> bool {
    file_name.starts_with("junit_") && file_name.ends_with(".xml")
}

/// Read and parse a marker; absent or timed-out reads yield `None`.
pub async fn read_metadata(
    store: &dyn ArtifactStore,
    path: &str,
) -> AppResult<Option<BuildMetadata>> {
    match read_if_present(store, path).await? {
        Some(data) => BuildMetadata::parse(path, &data),
        None => Ok(None),
    }
}

/// Collect markers and test results for `build_dir`.
///
/// Returns `Ok(None)` when neither `started.json` nor `finished.json` exists.
/// When only one exists the other is reported as `None`.
pub async fn build_details(
    store: &dyn ArtifactStore,
    build_dir: &str,
) -> AppResult<Option<BuildDetails>> {
    let started_path = join_path(build_dir, "started.json");
    let finished_path = join_path(build_dir, "finished.json");
    let artifacts_dir = join_path(build_dir, ARTIFACTS_DIR);

    let (started, finished, listing) = tokio::join!(
        read_if_present(store, &started_path),
        read_if_present(store, &finished_path),
        store.list(&artifacts_dir),
    );

    let (started, finished) = (started?, finished?);
    if started.is_none() && finished.is_none() {
        debug!(build_dir = %build_dir, "No markers found, build does not exist");
        return Ok(None);
    }

    let started = match started {
        Some(data) => BuildMetadata::parse(&started_path, &data)?,
        None => None,
    };
    let finished = match finished {
        Some(data) => BuildMetadata::parse(&finished_path, &data)?,
        None => None,
    };

    let junit_paths: Vec<String> = listing?
        .into_iter()
        .filter(|entry| !entry.is_dir && is_junit_report(entry.name()))
        .map(|entry| entry.path)
        .collect();

    let reports = join_all(junit_paths.iter().map(|path| read_if_present(store, path))).await;

    let mut parser = JunitParser::new();
    for (path, report) in junit_paths.iter().zip(reports) {
        if let Some(data) = report? {
            parser.parse_xml(&data, path);
        }
    }
    let results: SuiteResult = parser.into_results();

    info!(
        build_dir = %build_dir,
        reports = junit_paths.len(),
        passed = results.passed.len(),
        failed = results.failed.len(),
        skipped = results.skipped.len(),
        "Resolved build details"
    );

    Ok(Some(BuildDetails {
        build_dir: build_dir.to_string(),
        started,
        finished,
        results,
    }))
}
