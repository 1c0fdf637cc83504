//! Redis-backed collection cache and shared pool construction.
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, PoolConfig, Runtime};
use recipebox_common::Recipe;

use super::{CacheError, RecipeCache, RECIPES_KEY};

/// Build a Redis pool and check that a connection can be obtained.
pub async fn create_pool(url: &str, pool_size: usize, timeout: Duration) -> anyhow::Result<Pool> {
    let mut redis_config = Config::from_url(url);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| PoolConfig::new(pool_size));
    pool_config.max_size = pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
    pool.get()
        .await
        .map_err(|e| anyhow::anyhow!("Redis at {url} is unreachable: {e}"))?;
    tracing::info!(url = %url, pool_size, "connected to Redis");
    Ok(pool)
}

fn backend<E: std::fmt::Display>(e: E) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    key: String,
    ttl: Option<Duration>,
}

impl RedisCache {
    pub fn new(pool: Pool, ttl: Option<Duration>) -> Self {
        Self {
            pool,
            key: RECIPES_KEY.to_string(),
            ttl,
        }
    }
}

#[async_trait]
impl RecipeCache for RedisCache {
    async fn get_recipes(&self) -> Result<Vec<Recipe>, CacheError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let value: Option<String> = conn.get(&self.key).await.map_err(backend)?;
        let value = value.ok_or(CacheError::KeyAbsent)?;
        Ok(serde_json::from_str(&value)?)
    }

    async fn set_recipes(&self, recipes: &[Recipe]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(recipes)?;
        let mut conn = self.pool.get().await.map_err(backend)?;
        match self.ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(&self.key, payload, ttl.as_secs().max(1))
                .await
                .map_err(backend),
            None => conn
                .set::<_, _, ()>(&self.key, payload)
                .await
                .map_err(backend),
        }
    }

    async fn clear_recipes(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        conn.del::<_, ()>(&self.key).await.map_err(backend)
    }
}
