// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `recipebox` server: a pluggable
//! authentication gate in front of a cache-aside recipe store.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod recipes;
pub mod router;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthRateLimiter, AuthStrategy};
use crate::cache::{MemoryCache, RecipeCache, RedisCache};
use crate::config::{AuthStrategyKind, CacheBackendKind, SessionStoreKind, Settings};
use crate::recipes::RecipeService;
use crate::storage::Stores;

pub use router::create_router;

/// How often stale sign-in throttle entries are dropped
const THROTTLE_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Active authentication strategy
    pub auth: Arc<dyn AuthStrategy>,
    /// Cache-aside recipe access
    pub recipes: Arc<RecipeService>,
    pub settings: Arc<Settings>,
    /// Sign-in lockout tracking
    pub throttle: Arc<AuthRateLimiter>,
}

impl AppState {
    /// Assemble state from already-built parts
    pub fn new(auth: Arc<dyn AuthStrategy>, recipes: Arc<RecipeService>, settings: Settings) -> Self {
        let throttle = Arc::new(AuthRateLimiter::new(
            settings.auth.max_failed_attempts,
            settings.auth.lockout(),
        ));
        Self {
            auth,
            recipes,
            settings: Arc::new(settings),
            throttle,
        }
    }

    /// Build every provider named by `settings`: durable store, cache,
    /// session store and auth strategy.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        for warning in settings.warnings() {
            tracing::warn!(%warning, "configuration warning");
        }
        let stores = storage::open(&settings.storage)?;

        let needs_redis = settings.cache.backend == CacheBackendKind::Redis
            || (settings.auth.strategy == AuthStrategyKind::Session
                && settings.auth.session_store == SessionStoreKind::Redis);
        let redis = if needs_redis {
            Some(
                cache::redis::create_pool(
                    &settings.cache.redis_url,
                    settings.cache.pool_size,
                    settings.cache.timeout(),
                )
                .await?,
            )
        } else {
            None
        };

        let cache: Arc<dyn RecipeCache> = match (&settings.cache.backend, &redis) {
            (CacheBackendKind::Redis, Some(pool)) => {
                Arc::new(RedisCache::new(pool.clone(), settings.cache.ttl()))
            },
            _ => Arc::new(MemoryCache::new(settings.cache.ttl())),
        };
        tracing::info!(backend = ?settings.cache.backend, "recipe cache ready");

        let auth = auth::build_strategy(&settings.auth, stores.users.clone(), redis.as_ref())?;
        let state = Self::with_stores(auth, stores, cache, settings);
        state.throttle.spawn_cleanup(THROTTLE_CLEANUP_INTERVAL);
        Ok(state)
    }

    /// Wire a recipe service over `stores` and `cache` using the configured deadlines
    pub fn with_stores(
        auth: Arc<dyn AuthStrategy>,
        stores: Stores,
        cache: Arc<dyn RecipeCache>,
        settings: Settings,
    ) -> Self {
        let recipes = Arc::new(RecipeService::new(
            stores.recipes,
            cache,
            settings.storage.timeout(),
            settings.cache.timeout(),
        ));
        Self::new(auth, recipes, settings)
    }
}
