//! Build histories for a pull request and their table layout.
//!
//! PR builds live under `<pull_prefix>/<pr>/<job>/<build>/`. Build ids are
//! not densely numbered there, so every job directory is listed directly.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use futures_util::future::join_all;
use tracing::{debug, error};

use crate::error::AppResult;
use crate::models::{BuildRecord, JobHistory, PrInfo, PrRow, PrTable};
use crate::services::build_list::fetch_record;
use crate::services::build_numbers::natural_cmp;
use crate::services::storage::{ArtifactStore, dir_prefix};

/// Ids longer than this are content hashes rather than build numbers.
pub const MAX_NUMERIC_ID_LEN: usize = 8;

/// Pseudo-PR collecting batch merge runs.
pub const BATCH_PR: &str = "batch";

/// Window of batch builds kept in the PR table, in seconds.
pub const BATCH_WINDOW_SECS: i64 = 60 * 60 * 24;

/// Collect every job's builds under `pr_path`, newest id first.
///
/// A job whose listing fails, and builds whose markers cannot be read, are
/// logged and left out so the remaining jobs still render.
pub async fn pr_builds(store: &dyn ArtifactStore, pr_path: &str) -> AppResult<Vec<JobHistory>> {
    let job_dirs: Vec<_> = store
        .list(&dir_prefix(pr_path))
        .await?
        .into_iter()
        .filter(|entry| entry.is_dir)
        .collect();

    let listings = join_all(job_dirs.iter().map(|job| store.list(&job.path))).await;

    let mut candidates = Vec::new();
    let mut histories: BTreeMap<String, Vec<BuildRecord>> = BTreeMap::new();
    for (job, listing) in job_dirs.iter().zip(listings) {
        let job_name = job.name().to_string();
        match listing {
            Ok(entries) => {
                for build in entries.into_iter().filter(|entry| entry.is_dir) {
                    let location = build.path.trim_end_matches('/').to_string();
                    candidates.push((job_name.clone(), build.name().to_string(), location));
                }
                histories.entry(job_name).or_default();
            }
            Err(e) => error!(job = %job_name, error = %e, "Failed to list job builds"),
        }
    }

    let records = join_all(candidates.into_iter().map(|(job, id, location)| async move {
        (job, fetch_record(store, id, location).await)
    }))
    .await;

    for (job, record) in records {
        match record {
            Ok(record) if record.exists() => {
                histories.entry(job).or_default().push(record);
            }
            Ok(record) => debug!(location = %record.location, "Skipping build without markers"),
            Err(e) => error!(job = %job, error = %e, "Failed to resolve PR build"),
        }
    }

    Ok(histories
        .into_iter()
        .map(|(job, mut builds)| {
            builds.sort_by(|a, b| natural_cmp(&b.id, &a.id));
            JobHistory::new(job, builds)
        })
        .collect())
}

/// Re-sort histories containing hash ids by descending start time.
///
/// Builds without a start timestamp sort last.
pub fn sort_hashed_histories(histories: &mut [JobHistory]) {
    for history in histories.iter_mut() {
        if history
            .builds
            .iter()
            .any(|b| b.id.len() > MAX_NUMERIC_ID_LEN)
        {
            history
                .builds
                .sort_by_key(|b| Reverse(b.start_timestamp().unwrap_or(0)));
        }
    }
}

/// Keep builds started after `cutoff`. Builds without a timestamp are kept.
pub fn retain_started_after(histories: &mut [JobHistory], cutoff: i64) {
    for history in histories.iter_mut() {
        history
            .builds
            .retain(|b| b.start_timestamp().is_none_or(|ts| ts > cutoff));
    }
}

/// Lay histories out as rows of equal length, one per job in name order.
pub fn builds_to_table(histories: &[JobHistory]) -> PrTable {
    let max_builds = histories
        .iter()
        .map(|h| h.builds.len())
        .max()
        .unwrap_or(0);

    let headings = (0..max_builds)
        .map(|i| format!("build {}", max_builds - i))
        .collect();

    let mut rows: Vec<PrRow> = histories
        .iter()
        .map(|history| {
            let mut cells: Vec<Option<BuildRecord>> =
                history.builds.iter().cloned().map(Some).collect();
            cells.resize(max_builds, None);
            PrRow {
                job: history.job.clone(),
                cells,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.job.cmp(&b.job));

    PrTable {
        max_builds,
        headings,
        rows,
    }
}

// ============================================================================
// PR paths
// ============================================================================

/// Split `/org/repo`, `/repo` or an empty path into `(org, repo)`.
pub fn org_repo(path: &str, default_org: &str, default_repo: &str) -> (String, String) {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [org, repo] => (org.to_string(), repo.to_string()),
        [repo] => (default_org.to_string(), repo.to_string()),
        _ => (default_org.to_string(), default_repo.to_string()),
    }
}

/// Storage path of a PR's builds.
pub fn pr_path(
    pull_prefix: &str,
    org: &str,
    repo: &str,
    pr: &str,
    default_org: &str,
    default_repo: &str,
) -> String {
    let prefix = pull_prefix.trim_end_matches('/');
    if org == default_org && repo == default_repo {
        format!("{}/{}", prefix, pr)
    } else if org == default_org {
        format!("{}/{}/{}", prefix, repo, pr)
    } else {
        format!("{}/{}_{}/{}", prefix, org, repo, pr)
    }
}

/// Recover the PR number and repository from a path under `pull_prefix`.
///
/// Accepts `<prefix>/<pr>`, `<prefix>/<repo>/<pr>` and
/// `<prefix>/<org>_<repo>/<pr>`. Other paths yield `None`.
pub fn parse_pr_path(
    path: &str,
    pull_prefix: &str,
    default_org: &str,
    default_repo: &str,
) -> Option<PrInfo> {
    let rest = path
        .trim_end_matches('/')
        .strip_prefix(pull_prefix.trim_end_matches('/'))?
        .strip_prefix('/')?;

    let (repo, number) = match rest.split('/').collect::<Vec<_>>().as_slice() {
        [number] => (format!("{}/{}", default_org, default_repo), *number),
        [repo, number] if repo.contains('_') => (repo.replacen('_', "/", 1), *number),
        [repo, number] => (format!("{}/{}", default_org, repo), *number),
        _ => return None,
    };

    if number.is_empty() || repo.ends_with('/') {
        return None;
    }

    Some(PrInfo {
        number: number.to_string(),
        repo,
    })
}
