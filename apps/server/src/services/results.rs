//! Cached entry points used by the HTTP layer.
//!
//! Wraps the aggregation functions with the result cache and adds the pieces
//! that need configuration: build log lookup, PR paths and pointer redirects.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{CacheSettings, PrSettings};
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildDetails, BuildLog, BuildMetadata, BuildRecord, BuildView, PrInfo, PrView, SuiteResult,
};
use crate::services::build_details::build_details;
use crate::services::build_list::build_list;
use crate::services::cache::ResultCache;
use crate::services::live_log::LiveLogClient;
use crate::services::log_digest::digest;
use crate::services::pr_builds::{
    BATCH_PR, BATCH_WINDOW_SECS, builds_to_table, parse_pr_path, pr_builds, pr_path,
    retain_started_after, sort_hashed_histories,
};
use crate::services::storage::{
    ArtifactStore, ListEntry, dir_prefix, join_path, read_if_present, resolve_pointer,
};

/// Build log file uploaded next to the markers.
pub const BUILD_LOG_FILE: &str = "build-log.txt";

/// Prefix suffix of job directories holding redirect files.
const DIRECTORY_SUFFIX: &str = "/directory";

/// Whether the build log is worth showing.
///
/// Wanted when forced, while the build is still running, or when it failed
/// without more than one failed test to explain why.
pub fn wants_build_log(
    force: bool,
    finished: Option<&BuildMetadata>,
    results: &SuiteResult,
) -> bool {
    force
        || finished.is_none_or(|finished| {
            finished.result() != Some("SUCCESS") && results.failed.len() <= 1
        })
}

#[derive(Clone)]
pub struct BuildResults {
    store: Arc<dyn ArtifactStore>,
    cache: ResultCache,
    ttls: CacheSettings,
    pr: PrSettings,
    live_log: Option<LiveLogClient>,
}

impl BuildResults {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        cache: ResultCache,
        ttls: CacheSettings,
        pr: PrSettings,
    ) -> Self {
        Self {
            store,
            cache,
            ttls,
            pr,
            live_log: None,
        }
    }

    pub fn with_live_log(mut self, client: LiveLogClient) -> Self {
        self.live_log = Some(client);
        self
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    pub fn pr_settings(&self) -> &PrSettings {
        &self.pr
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Markers and test results of `build_dir`, cached briefly since a
    /// running build changes between polls. Missing builds are not cached.
    pub async fn build_details(&self, build_dir: &str) -> AppResult<Option<BuildDetails>> {
        let build_dir = build_dir.trim_end_matches('/');
        self.cache
            .memoize_present(
                format!("build-details://{}", build_dir),
                self.ttls.build_details_ttl,
                || build_details(self.store(), build_dir),
            )
            .await
    }

    /// Recent builds of `job_dir`, newest first.
    pub async fn build_list(
        &self,
        job_dir: &str,
        before: Option<&str>,
    ) -> AppResult<Vec<BuildRecord>> {
        let job_dir = dir_prefix(job_dir);
        self.cache
            .memoize(
                format!("build-list://{}?before={}", job_dir, before.unwrap_or("")),
                self.ttls.build_list_ttl,
                || build_list(self.store(), &job_dir, before),
            )
            .await
    }

    /// Digest of the uploaded `build-log.txt`, if any. Only found logs are
    /// cached; the file is usually uploaded when the build finishes.
    pub async fn stored_build_log(&self, build_dir: &str) -> AppResult<Option<String>> {
        let path = join_path(build_dir, BUILD_LOG_FILE);
        self.cache
            .memoize_present(
                format!("build-log-parsed://{}", build_dir.trim_end_matches('/')),
                self.ttls.build_log_ttl,
                || async {
                    let log = read_if_present(self.store(), &path).await?;
                    Ok::<_, AppError>(log.filter(|data| !data.is_empty()).map(|data| digest(&data)))
                },
            )
            .await
    }

    /// Stored build log, falling back to the live controller.
    pub async fn build_log(
        &self,
        build_dir: &str,
        job: &str,
        build: &str,
    ) -> AppResult<Option<BuildLog>> {
        if let Some(digest) = self.stored_build_log(build_dir).await? {
            return Ok(Some(BuildLog {
                digest,
                source_url: None,
            }));
        }

        match &self.live_log {
            Some(client) => Ok(client.fetch_log(job, build).await),
            None => Ok(None),
        }
    }

    /// Resolve one build for display.
    ///
    /// `prefix` is the storage path of the job's parent directory. Under a
    /// `.../directory` prefix the build is a redirect file that is followed
    /// when the build directory itself has no markers.
    pub async fn build_view(
        &self,
        prefix: &str,
        job: &str,
        build: &str,
        force_log: bool,
    ) -> AppResult<BuildView> {
        let prefix = format!("/{}", prefix.trim_matches('/'));
        let job_dir = format!("{}/{}", prefix, job);
        let mut build_dir = format!("{}/{}", job_dir, build);

        let mut details = self.build_details(&build_dir).await?;
        if details.is_none()
            && prefix.ends_with(DIRECTORY_SUFFIX)
            && let Some(target) = self.follow_pointer(&job_dir, build).await?
        {
            debug!(from = %build_dir, to = %target, "Following build pointer");
            details = self.build_details(&target).await?;
            build_dir = target;
        }
        let details =
            details.ok_or_else(|| AppError::NotFound(format!("Build {}", build_dir)))?;

        let log = if wants_build_log(force_log, details.finished.as_ref(), &details.results) {
            self.build_log(&build_dir, job, build).await?
        } else {
            None
        };

        let pr = parse_pr_path(
            &prefix,
            &self.pr.pull_prefix,
            &self.pr.default_org,
            &self.pr.default_repo,
        );

        info!(
            build_dir = %build_dir,
            failed = details.results.failed.len(),
            has_log = log.is_some(),
            "Resolved build view"
        );

        Ok(BuildView {
            job: job.to_string(),
            build: build.to_string(),
            commit: details.commit().map(str::to_string),
            pull_refs: details.pull_refs(),
            pr,
            log,
            details,
        })
    }

    async fn follow_pointer(&self, job_dir: &str, build: &str) -> AppResult<Option<String>> {
        let pointer_path = format!("{}/{}.txt", job_dir, build);
        let Some(content) = read_if_present(self.store(), &pointer_path).await? else {
            return Ok(None);
        };
        let target = resolve_pointer(&content);
        if target.is_none() {
            warn!(path = %pointer_path, "Pointer does not reference a known storage scheme");
        }
        Ok(target)
    }

    /// Build table of one pull request (or the `batch` pseudo-PR).
    pub async fn pr_table(&self, org: &str, repo: &str, pr: &str) -> AppResult<PrView> {
        let path = pr_path(
            &self.pr.pull_prefix,
            org,
            repo,
            pr,
            &self.pr.default_org,
            &self.pr.default_repo,
        );

        let mut histories = self
            .cache
            .memoize(
                format!("pr-builds://{}", path),
                self.ttls.pr_builds_ttl,
                || pr_builds(self.store(), &path),
            )
            .await?;

        sort_hashed_histories(&mut histories);
        if pr == BATCH_PR {
            let cutoff = chrono::Utc::now().timestamp() - BATCH_WINDOW_SECS;
            retain_started_after(&mut histories, cutoff);
        }

        let table = builds_to_table(&histories);
        info!(path = %path, jobs = table.rows.len(), max_builds = table.max_builds, "Assembled PR table");

        Ok(PrView {
            pr: PrInfo {
                number: pr.to_string(),
                repo: format!("{}/{}", org, repo),
            },
            path,
            table,
        })
    }

    /// Job directories directly under `jobs_dir`, sorted by path.
    pub async fn job_list(&self, jobs_dir: &str) -> AppResult<Vec<ListEntry>> {
        let mut jobs: Vec<ListEntry> = self
            .store
            .list(&dir_prefix(jobs_dir))
            .await?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .collect();
        jobs.sort();
        Ok(jobs)
    }
}
