//! Link cache contract and the default in-memory backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use crate::link::Link;

/// Key/value store of computed link sets.
///
/// Keys are opaque, case-sensitive strings. A `set` fully replaces whatever
/// was stored under the key. `ttl = None` means no automatic expiry; eviction
/// beyond that is the backend's own policy. Implementations must tolerate
/// concurrent `try_get`/`set` calls from many requests.
#[async_trait]
pub trait LinkCache: Send + Sync {
    /// Cached links for `key`, or `None` on a miss or after expiry.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    async fn try_get(&self, key: &str) -> anyhow::Result<Option<Vec<Link>>>;

    /// Store `links` under `key`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    async fn set(&self, key: &str, links: Vec<Link>, ttl: Option<Duration>) -> anyhow::Result<()>;
}

#[derive(Clone)]
struct CacheEntry {
    links: Arc<Vec<Link>>,
    ttl: Option<Duration>,
}

/// Each entry expires after its own TTL; overwriting restarts the clock.
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process link cache with per-entry TTL and an optional size bound.
///
/// When `max_entries` is set, moka evicts by its `TinyLFU` policy once the
/// bound is reached.
pub struct InMemoryLinkCache {
    entries: Cache<String, CacheEntry>,
}

impl InMemoryLinkCache {
    /// Unbounded cache; entries live until their TTL, if any.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    #[must_use]
    pub fn with_capacity(max_entries: Option<u64>) -> Self {
        let mut builder = Cache::<String, CacheEntry>::builder().expire_after(PerEntryTtl);
        if let Some(max) = max_entries {
            builder = builder.max_capacity(max);
        }
        Self {
            entries: builder.build(),
        }
    }

    /// Approximate number of live entries.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for InMemoryLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for InMemoryLinkCache {
    async fn try_get(&self, key: &str) -> anyhow::Result<Option<Vec<Link>>> {
        Ok(self
            .entries
            .get(key)
            .await
            .map(|entry| entry.links.as_ref().clone()))
    }

    async fn set(&self, key: &str, links: Vec<Link>, ttl: Option<Duration>) -> anyhow::Result<()> {
        let entry = CacheEntry {
            links: Arc::new(links),
            ttl,
        };
        self.entries.insert(key.to_owned(), entry).await;
        Ok(())
    }
}
