use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};

use super::EnrichmentCache;

/// Upper bound for connecting and for each command. A slow Redis must turn
/// into a cache miss, not stall the pipeline.
pub const REDIS_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis-backed enrichment cache over a single multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        Self::connect_with_timeout(redis_url, REDIS_OP_TIMEOUT).await
    }

    pub async fn connect_with_timeout(redis_url: &str, op_timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("invalid REDIS_URL")?;
        let mut conn = bounded("connect", op_timeout, client.get_multiplexed_async_connection())
            .await
            .context("failed to connect to Redis")?;

        // Verify connectivity
        let _: String = bounded("PING", op_timeout, redis::cmd("PING").query_async(&mut conn)).await?;

        Ok(Self { conn, op_timeout })
    }
}

async fn bounded<T>(
    op: &'static str,
    limit: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => anyhow::bail!("Redis {op} timed out after {limit:?}"),
    }
}

#[async_trait]
impl EnrichmentCache for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        bounded("GET", self.op_timeout, conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        bounded("SET", self.op_timeout, conn.set_ex(key, value, ttl.as_secs().max(1))).await
    }

    fn backend_type(&self) -> &'static str {
        "redis"
    }
}
