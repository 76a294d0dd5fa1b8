//! Discovery of recent build identifiers for a job directory.
//!
//! The fast path reads `latest-build.txt` and probes forward for builds that
//! started after it was written. When no usable pointer exists, or when
//! paginating with `before`, the job directory is listed and sorted with a
//! numeric-aware comparator.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::services::storage::{ArtifactStore, dir_prefix, read_if_present};

/// Maximum number of builds returned per page.
pub const PAGE_SIZE: usize = 40;

/// Object recording the most recent finished build number.
pub const LATEST_BUILD_FILE: &str = "latest-build.txt";

/// Compare strings by splitting them into runs of digits and non-digits.
///
/// Digit runs compare by numeric value (of any length), other runs
/// lexicographically. Equal numeric values with different leading zeros order
/// the shorter run first so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs::new(a);
    let mut right = Runs::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digit_run(x), is_digit_run(y)) {
                    (true, true) => compare_numeric(x, y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_digit_run(run: &str) -> bool {
    run.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn compare_numeric(x: &str, y: &str) -> Ordering {
    let x_trimmed = x.trim_start_matches('0');
    let y_trimmed = y.trim_start_matches('0');
    x_trimmed
        .len()
        .cmp(&y_trimmed.len())
        .then_with(|| x_trimmed.cmp(y_trimmed))
        .then_with(|| x.len().cmp(&y.len()))
}

/// Iterator over maximal digit / non-digit runs of a string.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Runs<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(run)
    }
}

/// Recent build ids for `job_dir`, newest first, at most [`PAGE_SIZE`].
///
/// `before` restricts the result to builds strictly older than it. In
/// `indirect` mode builds are `<id>.txt` pointer files instead of numbered
/// subdirectories.
pub async fn get_build_numbers(
    store: &dyn ArtifactStore,
    job_dir: &str,
    before: Option<&str>,
    indirect: bool,
) -> AppResult<Vec<String>> {
    let job_dir = dir_prefix(job_dir);

    // PR builds are not densely numbered, so probing makes no sense there.
    let fast_path_allowed = before.is_none() && (indirect || !job_dir.contains("/pull/"));
    if fast_path_allowed && let Some(latest) = read_latest_build(store, &job_dir).await {
        let newest = probe_newer_builds(store, &job_dir, latest, indirect).await;
        debug!(job_dir = %job_dir, latest, newest, "Enumerated builds via latest pointer");
        return Ok(descending_range(newest));
    }

    list_build_numbers(store, &job_dir, before, indirect).await
}

async fn read_latest_build(store: &dyn ArtifactStore, job_dir: &str) -> Option<u64> {
    let path = format!("{}{}", job_dir, LATEST_BUILD_FILE);
    match read_if_present(store, &path).await {
        Ok(Some(data)) => std::str::from_utf8(&data).ok()?.trim().parse::<u64>().ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read latest build pointer, listing instead");
            None
        }
    }
}

/// Probe `latest+1`, `latest+2`, ... until a build is missing.
async fn probe_newer_builds(
    store: &dyn ArtifactStore,
    job_dir: &str,
    latest: u64,
    indirect: bool,
) -> u64 {
    let mut newest = latest;
    // A pointer at u64::MAX has no successor to probe.
    while let Some(candidate) = newest.checked_add(1) {
        let path = if indirect {
            format!("{}{}.txt", job_dir, candidate)
        } else {
            format!("{}{}/started.json", job_dir, candidate)
        };
        match read_if_present(store, &path).await {
            Ok(Some(data)) if !data.is_empty() => newest = candidate,
            Ok(_) => return newest,
            Err(e) => {
                warn!(path = %path, error = %e, "Probe failed, stopping at last known build");
                return newest;
            }
        }
    }
    newest
}

fn descending_range(newest: u64) -> Vec<String> {
    (1..=newest)
        .rev()
        .take(PAGE_SIZE)
        .map(|n| n.to_string())
        .collect()
}

async fn list_build_numbers(
    store: &dyn ArtifactStore,
    job_dir: &str,
    before: Option<&str>,
    indirect: bool,
) -> AppResult<Vec<String>> {
    let mut entries = store.list(job_dir).await?;
    entries.sort_by(|a, b| natural_cmp(&b.path, &a.path));

    let builds = entries.iter().filter_map(|entry| {
        if indirect {
            if entry.is_dir {
                return None;
            }
            let id = entry.name().strip_suffix(".txt")?;
            (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then(|| id.to_string())
        } else {
            entry.is_dir.then(|| entry.name().to_string())
        }
    });

    let builds: Vec<String> = match before {
        Some(before) => builds
            .filter(|id| natural_cmp(id, before) == Ordering::Less)
            .take(PAGE_SIZE)
            .collect(),
        None => builds.take(PAGE_SIZE).collect(),
    };

    debug!(job_dir = %job_dir, count = builds.len(), "Enumerated builds via listing");
    Ok(builds)
}
