// ============================
// crates/backend-lib/src/storage/mod.rs
// ============================
//! Durable store abstraction with flat-file and in-memory implementations.
//!
//! The durable store is the source of truth for recipes and users. Every
//! mutation goes here first; caches only ever hold copies of what it returned.

mod flat_file;
mod memory;

pub use flat_file::FlatFileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use chrono::Utc;
use recipebox_common::Recipe;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageSettings};

/// Durable store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A user that may sign in; the password is only ever held as a scrypt hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
}

/// Recipe collection operations
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Every recipe, oldest first
    async fn fetch_all(&self) -> Result<Vec<Recipe>, StoreError>;

    async fn get(&self, id: &str) -> Result<Recipe, StoreError>;

    /// Recipes carrying `tag`, compared case-insensitively
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError>;

    /// Store a new recipe, assigning its id and publication time
    async fn insert(&self, recipe: Recipe) -> Result<Recipe, StoreError>;

    /// Merge `patch` into the stored recipe and return the result
    async fn update(&self, id: &str, patch: Recipe) -> Result<Recipe, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// User lookup used by the stored-user credential verifier
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert or replace a user
    async fn put_user(&self, user: UserRecord) -> Result<(), StoreError>;
}

/// Assign identity to a recipe about to be inserted.
///
/// Ids are UUIDv7 so lexical order follows creation order.
fn stamp_new(mut recipe: Recipe) -> Recipe {
    recipe.id = Some(Uuid::now_v7().simple().to_string());
    recipe.published_at = Some(Utc::now());
    recipe
}

/// Canonical form of a client-supplied id. Anything that is not a UUID cannot
/// name a stored recipe.
fn canonical_id(id: &str) -> Result<String, StoreError> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.simple().to_string())
        .map_err(|_| StoreError::NotFound(id.to_string()))
}

/// Handles onto one durable store backend
#[derive(Clone)]
pub struct Stores {
    pub recipes: Arc<dyn RecipeRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Stores {
    fn from_backend<T>(backend: T) -> Self
    where
        T: RecipeRepository + UserRepository + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            recipes: backend.clone(),
            users: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(MemoryStorage::new())
    }
}

/// Open the backend selected by `settings.backend`
pub fn open(settings: &StorageSettings) -> anyhow::Result<Stores> {
    let stores = match settings.backend {
        StorageBackend::File => Stores::from_backend(FlatFileStorage::new(&settings.data_dir)?),
        StorageBackend::Memory => Stores::memory(),
    };
    tracing::info!(backend = ?settings.backend, "durable store ready");
    Ok(stores)
}
