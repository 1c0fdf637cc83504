//! In-memory implementation, used for demos and tests.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use recipebox_common::Recipe;

use super::{canonical_id, stamp_new, RecipeRepository, StoreError, UserRecord, UserRepository};

#[derive(Clone, Default)]
pub struct MemoryStorage {
    // keyed by id; v7 ids keep the map in creation order
    recipes: Arc<RwLock<BTreeMap<String, Recipe>>>,
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeRepository for MemoryStorage {
    async fn fetch_all(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.recipes.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Recipe, StoreError> {
        let id = canonical_id(id)?;
        self.recipes
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .recipes
            .read()
            .values()
            .filter(|r| r.has_tag(tag))
            .cloned()
            .collect())
    }

    async fn insert(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        let recipe = stamp_new(recipe);
        let id = recipe.id.clone().unwrap_or_default();
        self.recipes.write().insert(id, recipe.clone());
        Ok(recipe)
    }

    async fn update(&self, id: &str, patch: Recipe) -> Result<Recipe, StoreError> {
        let id = canonical_id(id)?;
        let mut recipes = self.recipes.write();
        let recipe = recipes.get_mut(&id).ok_or(StoreError::NotFound(id.clone()))?;
        recipe.merge(patch);
        Ok(recipe.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = canonical_id(id)?;
        self.recipes
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl UserRepository for MemoryStorage {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn put_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.users.write().insert(user.username.clone(), user);
        Ok(())
    }
}
