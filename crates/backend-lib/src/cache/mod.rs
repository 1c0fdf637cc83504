// ============================
// crates/backend-lib/src/cache/mod.rs
// ============================
//! Collection cache used by the cache-aside read path.
//!
//! The cache holds exactly one entry: the whole recipe collection serialized
//! as a JSON array under [`RECIPES_KEY`]. There is no per-record state, so the
//! only transitions are populate (after a durable read) and invalidate (after
//! any write).

mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;

use async_trait::async_trait;
use recipebox_common::Recipe;
use std::time::Duration;
use thiserror::Error;

/// Cache key of the full recipe collection
pub const RECIPES_KEY: &str = "recipes";

#[derive(Error, Debug)]
pub enum CacheError {
    /// Expected miss signal, not a failure
    #[error("key does not exist in cache")]
    KeyAbsent,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::KeyAbsent)
    }
}

#[async_trait]
pub trait RecipeCache: Send + Sync {
    /// Cached collection, or [`CacheError::KeyAbsent`] when nothing is cached
    async fn get_recipes(&self) -> Result<Vec<Recipe>, CacheError>;

    async fn set_recipes(&self, recipes: &[Recipe]) -> Result<(), CacheError>;

    /// Delete the collection entry. Deleting an absent entry succeeds.
    async fn clear_recipes(&self) -> Result<(), CacheError>;
}
