//! Best-effort memoization of aggregation results with per-entry TTLs.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use tracing::debug;

use crate::error::AppResult;

#[derive(Clone)]
struct CachedEntry {
    value: Arc<dyn Any + Send + Sync>,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, CachedEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared result cache. Cloning is cheap and clones share entries.
///
/// Concurrent callers missing on the same key may both compute the value;
/// the last insert wins.
#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Cache<String, CachedEntry>>,
}

impl ResultCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Some(
                Cache::builder()
                    .max_capacity(max_entries)
                    .expire_after(EntryTtl)
                    .build(),
            ),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// successful result for `ttl`. Errors are never cached.
    pub async fn memoize<T, F, Fut>(&self, key: String, ttl: Duration, compute: F) -> AppResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let Some(cache) = &self.inner else {
            return compute().await;
        };

        if let Some(entry) = cache.get(&key)
            && let Some(value) = entry.value.downcast_ref::<T>()
        {
            debug!(key = %key, "Cache hit");
            return Ok(value.clone());
        }

        let value = compute().await?;
        cache.insert(
            key,
            CachedEntry {
                value: Arc::new(value.clone()),
                ttl,
            },
        );
        Ok(value)
    }

    /// Like [`memoize`](Self::memoize) but only caches `Some` results, so an
    /// object that appears later is picked up on the next call.
    pub async fn memoize_present<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        compute: F,
    ) -> AppResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Option<T>>>,
    {
        let Some(cache) = &self.inner else {
            return compute().await;
        };

        if let Some(entry) = cache.get(&key)
            && let Some(value) = entry.value.downcast_ref::<T>()
        {
            debug!(key = %key, "Cache hit");
            return Ok(Some(value.clone()));
        }

        let value = compute().await?;
        if let Some(value) = &value {
            cache.insert(
                key,
                CachedEntry {
                    value: Arc::new(value.clone()),
                    ttl,
                },
            );
        }
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        if let Some(cache) = &self.inner {
            cache.invalidate(key);
        }
    }
}
