//! Cache backends for the read-through weather cache.

use async_trait::async_trait;
use moka::future::Cache;
use std::fmt;
use std::time::Duration;

use stratus_core::CacheConfig;

use crate::context::RequestContext;
use crate::error::CacheError;
use crate::types::Weather;

/// Storage behind [`crate::Cached`].
///
/// Keys are city names exactly as the caller passed them. Any `get` error
/// is read as a miss. The TTL is fixed when the backend is built and applied
/// to every entry on write.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Weather, CacheError>;

    async fn set(&self, ctx: &RequestContext, key: &str, value: &Weather)
        -> Result<(), CacheError>;
}

/// In-process TTL cache holding JSON-serialized readings.
///
/// Backed by moka: entries older than the TTL are never returned and are
/// evicted by the cache's own housekeeping, and the entry count is capped.
#[derive(Clone)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Cache<String, String>,
}

impl MemoryCache {
    /// A cache bounded only by time.
    pub fn new(ttl: Duration) -> Self {
        Self::build(ttl, None)
    }

    /// A cache holding at most `max_entries` cities.
    pub fn bounded(ttl: Duration, max_entries: u64) -> Self {
        Self::build(ttl, Some(max_entries))
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::bounded(config.ttl(), config.max_entries)
    }

    fn build(ttl: Duration, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().time_to_live(ttl);
        if let Some(max) = max_entries {
            builder = builder.max_capacity(max);
        }
        Self {
            ttl,
            entries: builder.build(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of live entries, after flushing pending evictions.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, key: &str, payload: &str) {
        self.entries
            .insert(key.to_string(), payload.to_string())
            .await;
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, _ctx: &RequestContext, key: &str) -> Result<Weather, CacheError> {
        let payload = self
            .entries
            .get(key)
            .await
            .ok_or_else(|| CacheError::Miss(key.to_string()))?;

        match serde_json::from_str(&payload) {
            Ok(weather) => Ok(weather),
            Err(e) => {
                self.entries.invalidate(key).await;
                Err(e.into())
            }
        }
    }

    async fn set(
        &self,
        _ctx: &RequestContext,
        key: &str,
        value: &Weather,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        self.entries.insert(key.to_string(), payload).await;
        Ok(())
    }
}
