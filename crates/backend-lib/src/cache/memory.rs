//! Process-local cache backed by a `DashMap`.
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use recipebox_common::Recipe;

use super::{CacheError, RecipeCache, RECIPES_KEY};

#[derive(Clone, Debug)]
struct CachedEntry {
    payload: Arc<String>,
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Single-instance cache. Entries hold the same JSON the Redis backend stores.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
    key: String,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// `ttl` of `None` keeps the entry until the next invalidation.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            key: RECIPES_KEY.to_string(),
            ttl,
        }
    }

    /// Raw serialized value under `key`, if present and live
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.payload.as_ref().clone())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl RecipeCache for MemoryCache {
    async fn get_recipes(&self) -> Result<Vec<Recipe>, CacheError> {
        let payload = match self.entries.get(&self.key) {
            Some(entry) if !entry.is_expired() => Arc::clone(&entry.payload),
            Some(entry) => {
                drop(entry);
                self.entries.remove(&self.key);
                return Err(CacheError::KeyAbsent);
            },
            None => return Err(CacheError::KeyAbsent),
        };
        Ok(serde_json::from_str(&payload)?)
    }

    async fn set_recipes(&self, recipes: &[Recipe]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(recipes)?;
        let entry = CachedEntry {
            payload: Arc::new(payload),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(self.key.clone(), entry);
        Ok(())
    }

    async fn clear_recipes(&self) -> Result<(), CacheError> {
        self.entries.remove(&self.key);
        Ok(())
    }
}
