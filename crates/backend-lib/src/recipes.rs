// ============================
// crates/backend-lib/src/recipes.rs
// ============================
//! Cache-aside access to the recipe collection.
//!
//! Reads of the whole collection prefer the cache and fall back to the durable
//! store on a miss or on any cache failure, writing the fresh copy back.
//! Writes go to the durable store first and then delete the cached
//! collection; the cache is never updated in place.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use recipebox_common::Recipe;
use tokio::time::timeout;

use crate::cache::{CacheError, RecipeCache};
use crate::metrics::{CACHE_ERROR, CACHE_HIT, CACHE_INVALIDATE_FAILED, CACHE_MISS};
use crate::storage::{RecipeRepository, StoreError};

pub struct RecipeService {
    db: Arc<dyn RecipeRepository>,
    cache: Arc<dyn RecipeCache>,
    store_deadline: Duration,
    cache_deadline: Duration,
}

impl RecipeService {
    pub fn new(
        db: Arc<dyn RecipeRepository>,
        cache: Arc<dyn RecipeCache>,
        store_deadline: Duration,
        cache_deadline: Duration,
    ) -> Self {
        Self {
            db,
            cache,
            store_deadline,
            cache_deadline,
        }
    }

    async fn store_call<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        timeout(self.store_deadline, fut)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.store_deadline)))
    }

    async fn cache_call<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        timeout(self.cache_deadline, fut)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.cache_deadline)))
    }

    /// Whole collection, from cache when possible.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Recipe>, StoreError> {
        match self.cache_call(self.cache.get_recipes()).await {
            Ok(recipes) => {
                counter!(CACHE_HIT).increment(1);
                return Ok(recipes);
            },
            Err(CacheError::KeyAbsent) => {
                counter!(CACHE_MISS).increment(1);
                tracing::debug!("recipes not cached, reading durable store");
            },
            Err(e) => {
                counter!(CACHE_ERROR).increment(1);
                tracing::warn!(error = %e, "Error while fetching recipes from cache");
            },
        }

        let recipes = self.store_call(self.db.fetch_all()).await?;

        if let Err(e) = self.cache_call(self.cache.set_recipes(&recipes)).await {
            counter!(CACHE_ERROR).increment(1);
            tracing::warn!(error = %e, "Error while caching recipes");
        }
        Ok(recipes)
    }

    pub async fn fetch_one(&self, id: &str) -> Result<Recipe, StoreError> {
        self.store_call(self.db.get(id)).await
    }

    pub async fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        self.store_call(self.db.find_by_tag(tag)).await
    }

    #[tracing::instrument(skip(self, recipe), fields(name = %recipe.name))]
    pub async fn create(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        let created = self.store_call(self.db.insert(recipe)).await?;
        self.invalidate().await;
        Ok(created)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: Recipe) -> Result<Recipe, StoreError> {
        let updated = self.store_call(self.db.update(id, patch)).await?;
        self.invalidate().await;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store_call(self.db.delete(id)).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Drop the cached collection. A failure leaves a stale entry until its
    /// TTL or the next successful invalidation; the write itself already
    /// succeeded.
    async fn invalidate(&self) {
        if let Err(e) = self.cache_call(self.cache.clear_recipes()).await {
            counter!(CACHE_INVALIDATE_FAILED).increment(1);
            tracing::warn!(error = %e, "Error while invalidating recipe cache");
        }
    }
}
