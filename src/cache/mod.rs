pub mod redis_cache;

pub use redis_cache::RedisCache;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Key-value store with per-entry TTL used for enrichment lookups.
///
/// Errors are reported, never retried; callers treat a failed `get` as a miss.
#[async_trait]
pub trait EnrichmentCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}

/// Redis when configured and reachable, otherwise the in-process cache.
pub async fn connect_cache(redis_url: Option<&str>) -> Arc<dyn EnrichmentCache> {
    let Some(url) = redis_url else {
        tracing::warn!("REDIS_URL not set, using in-memory enrichment cache");
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(url).await {
        Ok(cache) => {
            tracing::info!("Redis connected");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis connection failed, using in-memory enrichment cache");
            Arc::new(MemoryCache::new())
        }
    }
}

/// In-process cache. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|(_, expires)| *expires > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EnrichmentCache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let expires = Instant::now() + ttl;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_connect_cache_falls_back_to_memory() {
        let unset = connect_cache(None).await;
        assert_eq!(unset.backend_type(), "memory");

        // Nothing listens on the discard port.
        let unreachable = connect_cache(Some("redis://127.0.0.1:9")).await;
        assert_eq!(unreachable.backend_type(), "memory");

        let invalid = connect_cache(Some("not a url")).await;
        assert_eq!(invalid.backend_type(), "memory");
        invalid.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(invalid.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }
}
