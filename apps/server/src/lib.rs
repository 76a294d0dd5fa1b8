//! Buildlens server library.
//!
//! Aggregates CI build results stored in an artifact bucket: build markers,
//! JUnit reports, build lists, per-PR build tables and build log digests.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::{AppError, AppResult};
use crate::services::{
    ArtifactStore, BuildResults, LiveLogClient, LocalStore, ResultCache, S3Store, TimeoutStore,
};

/// Build the shared result service from configuration.
pub fn build_results(config: &Config) -> AppResult<BuildResults> {
    let storage = &config.storage;
    let store: Arc<dyn ArtifactStore> = match storage.backend {
        StorageBackend::S3 => Arc::new(TimeoutStore::new(
            S3Store::new(&storage.s3),
            storage.read_timeout,
        )),
        StorageBackend::Local => {
            let root = storage.data_dir.clone().ok_or_else(|| {
                AppError::InvalidInput("BV_DATA_DIR is required for local storage".to_string())
            })?;
            info!(root = %root.display(), "Using local artifact storage");
            Arc::new(TimeoutStore::new(LocalStore::new(root), storage.read_timeout))
        }
    };

    let cache = if config.cache.enabled {
        ResultCache::new(config.cache.max_entries)
    } else {
        info!("Result cache disabled");
        ResultCache::disabled()
    };

    let results = BuildResults::new(store, cache, config.cache.clone(), config.pr.clone());
    match &config.live_log_url {
        Some(url) => {
            let client = LiveLogClient::new(url)?;
            info!(url = %client.base_url(), "Live log fallback enabled");
            Ok(results.with_live_log(client))
        }
        None => Ok(results),
    }
}
