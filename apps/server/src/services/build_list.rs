//! Recent builds of a job with their started/finished markers.
//!
//! Stops short of reading artifacts; full test results come from
//! [`build_details`](crate::services::build_details).

use futures_util::future::join_all;
use tracing::{error, warn};

use crate::error::AppResult;
use crate::models::BuildRecord;
use crate::services::build_details::read_metadata;
use crate::services::build_numbers::get_build_numbers;
use crate::services::storage::{ArtifactStore, dir_prefix, join_path, read_if_present, resolve_pointer};

/// Job directories whose builds are redirect files rather than subdirectories.
pub fn is_indirect(job_dir: &str) -> bool {
    job_dir.contains("/directory/")
}

/// Builds of `job_dir` newest first, optionally older than `before`.
///
/// Candidates that do not exist, whose pointer does not resolve, or whose
/// markers cannot be read are left out; the remaining builds keep the
/// enumeration order.
pub async fn build_list(
    store: &dyn ArtifactStore,
    job_dir: &str,
    before: Option<&str>,
) -> AppResult<Vec<BuildRecord>> {
    let job_dir = dir_prefix(job_dir);
    let indirect = is_indirect(&job_dir);
    let ids = get_build_numbers(store, &job_dir, before, indirect).await?;

    let records = join_all(
        ids.into_iter()
            .map(|id| resolve_build(store, &job_dir, id, indirect)),
    )
    .await;

    Ok(records
        .into_iter()
        .flatten()
        .filter(BuildRecord::exists)
        .collect())
}

async fn resolve_build(
    store: &dyn ArtifactStore,
    job_dir: &str,
    id: String,
    indirect: bool,
) -> Option<BuildRecord> {
    let location = if indirect {
        let pointer_path = format!("{}{}.txt", job_dir, id);
        match read_if_present(store, &pointer_path).await {
            Ok(Some(content)) => match resolve_pointer(&content) {
                Some(location) => location,
                None => {
                    warn!(path = %pointer_path, "Pointer does not reference a known storage scheme");
                    return None;
                }
            },
            Ok(None) => return None,
            Err(e) => {
                error!(path = %pointer_path, error = %e, "Failed to read build pointer");
                return None;
            }
        }
    } else {
        format!("{}{}", job_dir, id)
    };

    let build = id.clone();
    match fetch_record(store, id, location).await {
        Ok(record) => Some(record),
        Err(e) => {
            error!(job_dir = %job_dir, build = %build, error = %e, "Failed to resolve build");
            None
        }
    }
}

/// Read both markers of a build concurrently.
pub async fn fetch_record(
    store: &dyn ArtifactStore,
    id: String,
    location: String,
) -> AppResult<BuildRecord> {
    let started_path = join_path(&location, "started.json");
    let finished_path = join_path(&location, "finished.json");
    let (started, finished) = tokio::join!(
        read_metadata(store, &started_path),
        read_metadata(store, &finished_path),
    );

    Ok(BuildRecord {
        id,
        location,
        started: started?,
        finished: finished?,
    })
}
