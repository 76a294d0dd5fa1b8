//! Read-only access to the CI artifact bucket.
//!
//! Paths follow the bucket layout written by the CI fleet: `/<bucket>/<key>`,
//! e.g. `/ci-logs/logs/e2e-gce/1234/started.json`. Directory entries returned
//! by listings end with `/`.
//!
//! Backends: S3 (AWS or MinIO), a local directory tree for development, and an
//! in-memory store used by tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::S3Config;
use crate::error::{AppError, AppResult};

/// Pointer schemes recognized in `<build>.txt` redirect files.
const POINTER_SCHEMES: &[&str] = &["gs://", "s3://"];

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct ListEntry {
    /// Full path; directories end with `/`
    pub path: String,
    pub is_dir: bool,
}

impl ListEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self { path, is_dir: true }
    }

    /// Last path segment without the trailing slash.
    pub fn name(&self) -> &str {
        basename(&self.path)
    }
}

/// Key-value blob reads by exact path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a whole object. `Ok(None)` when it does not exist.
    async fn read(&self, path: &str) -> AppResult<Option<Vec<u8>>>;
}

/// Non-recursive, one-level directory listing.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list(&self, prefix: &str) -> AppResult<Vec<ListEntry>>;
}

/// Everything the aggregation engine needs from storage.
pub trait ArtifactStore: BlobStore + DirectoryLister {}

impl<T: BlobStore + DirectoryLister + ?Sized> ArtifactStore for T {}

/// Read an object whose absence is a normal outcome.
///
/// A timed-out read is reported as absent; other faults propagate.
pub async fn read_if_present(store: &dyn ArtifactStore, path: &str) -> AppResult<Option<Vec<u8>>> {
    match store.read(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.is_timeout() => {
            warn!(path = %path, "Read timed out, treating object as absent");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Join a directory path and a child name with exactly one `/`.
pub fn join_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Directory path with a guaranteed trailing `/`.
pub fn dir_prefix(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Last non-empty path segment.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Resolve the contents of a redirect file to a storage path.
///
/// `gs://bucket/logs/job/12` becomes `/bucket/logs/job/12`. Unknown schemes
/// yield `None`.
pub fn resolve_pointer(content: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(content).ok()?.trim();
    POINTER_SCHEMES.iter().find_map(|scheme| {
        let rest = text.strip_prefix(scheme)?.trim_end_matches('/');
        if rest.is_empty() {
            None
        } else {
            Some(format!("/{}", rest))
        }
    })
}

// ============================================================================
// S3
// ============================================================================

/// S3 storage client wrapper. The first path segment selects the bucket.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a new S3 client from configuration.
    pub fn new(config: &S3Config) -> Self {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "buildlens");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        // Use custom endpoint for MinIO in development
        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "S3 storage initialized: endpoint={}",
            config.endpoint.as_deref().unwrap_or("aws")
        );

        Self { client }
    }

    /// Split `/bucket/some/key` into `("bucket", "some/key")`.
    fn split_path(path: &str) -> AppResult<(&str, &str)> {
        let trimmed = path.trim_start_matches('/');
        let (bucket, key) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if bucket.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Storage path has no bucket: {}",
                path
            )));
        }
        Ok((bucket, key))
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn read(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        let (bucket, key) = Self::split_path(path)?;
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!(
                    "Failed to get {} from S3: {}",
                    path, service_error
                )));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(data))
    }
}

#[async_trait]
impl DirectoryLister for S3Store {
    async fn list(&self, prefix: &str) -> AppResult<Vec<ListEntry>> {
        let (bucket, key) = Self::split_path(prefix)?;
        let key_prefix = if key.is_empty() {
            String::new()
        } else {
            dir_prefix(key)
        };

        let mut entries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(&key_prefix)
                .delimiter("/")
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::Storage(format!(
                        "Failed to list {} in S3: {}",
                        prefix,
                        e.into_service_error()
                    ))
                })?;

            for common in response.common_prefixes() {
                if let Some(p) = common.prefix() {
                    entries.push(ListEntry::dir(format!("/{}/{}", bucket, p)));
                }
            }
            for object in response.contents() {
                if let Some(k) = object.key()
                    && k != key_prefix
                {
                    entries.push(ListEntry::file(format!("/{}/{}", bucket, k)));
                }
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated() == Some(true) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(entries)
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Bucket layout mirrored under a local directory (development).
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_path(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::InvalidInput(format!(
                "Path must not contain relative components: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn read(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        let local = self.local_path(path)?;
        match tokio::fs::read(&local).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Reading a directory as a blob behaves like a missing object.
            Err(_) if local.is_dir() => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to read {}: {}", path, e))),
        }
    }
}

#[async_trait]
impl DirectoryLister for LocalStore {
    async fn list(&self, prefix: &str) -> AppResult<Vec<ListEntry>> {
        let local = self.local_path(prefix)?;
        let mut dir = match tokio::fs::read_dir(&local).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to list {}: {}",
                    prefix, e
                )));
            }
        };

        let base = dir_prefix(prefix);
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await?.is_dir() {
                entries.push(ListEntry::dir(format!("{}{}", base, name)));
            } else {
                entries.push(ListEntry::file(format!("{}{}", base, name)));
            }
        }
        entries.sort();
        Ok(entries)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory object store with call counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    reads: AtomicUsize,
    lists: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object at an absolute path.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), data.into());
    }

    /// Number of `read` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `list` calls served so far.
    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn read(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }
}

#[async_trait]
impl DirectoryLister for MemoryStore {
    async fn list(&self, prefix: &str) -> AppResult<Vec<ListEntry>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let prefix = dir_prefix(prefix);
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);

        let mut entries = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        for key in objects.range(prefix.clone()..).map(|(k, _)| k) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        entries.push(ListEntry::dir(format!("{}{}", prefix, dir)));
                    }
                }
                None if !rest.is_empty() => entries.push(ListEntry::file(key.clone())),
                None => {}
            }
        }
        Ok(entries)
    }
}

// ============================================================================
// Timeouts
// ============================================================================

/// Applies a deadline to every read and listing of the wrapped store.
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for TimeoutStore<S> {
    async fn read(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        tokio::time::timeout(self.timeout, self.inner.read(path))
            .await
            .map_err(|_| AppError::Timeout(format!("read {}", path)))?
    }
}

#[async_trait]
impl<S: DirectoryLister> DirectoryLister for TimeoutStore<S> {
    async fn list(&self, prefix: &str) -> AppResult<Vec<ListEntry>> {
        tokio::time::timeout(self.timeout, self.inner.list(prefix))
            .await
            .map_err(|_| AppError::Timeout(format!("list {}", prefix)))?
    }
}
