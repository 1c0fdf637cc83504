//! Flat-file implementation: one JSON document per recipe plus `users.json`.
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use recipebox_common::Recipe;
use tokio::{fs as tokio_fs, sync::Mutex};
use uuid::Uuid;

use super::{canonical_id, stamp_new, RecipeRepository, StoreError, UserRecord, UserRepository};

/// Flat-file implementation of the repository traits
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    // one writer per recipe id at a time
    recipe_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    // serialises read-modify-write cycles on users.json
    users_lock: Arc<Mutex<()>>,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("recipes"))?;
        Ok(Self {
            root,
            recipe_locks: Arc::new(DashMap::new()),
            users_lock: Arc::new(Mutex::new(())),
        })
    }

    fn recipe_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.recipe_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn recipe_path(&self, id: &str) -> PathBuf {
        self.root.join("recipes").join(format!("{id}.json"))
    }

    fn users_path(&self) -> PathBuf {
        self.root.join("users.json")
    }

    async fn read_recipe(&self, id: &str) -> Result<Recipe, StoreError> {
        match tokio_fs::read_to_string(self.recipe_path(id)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a uniquely named temp file so readers never observe a
    /// half-written record.
    async fn write_atomic(path: &Path, contents: Vec<u8>) -> Result<(), StoreError> {
        let tmp = path.with_extension(format!("{}.tmp", Uuid::now_v7()));
        if let Err(e) = tokio_fs::write(&tmp, contents).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio_fs::rename(&tmp, path).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_recipe(&self, id: &str, recipe: &Recipe) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(recipe)?;
        Self::write_atomic(&self.recipe_path(id), json).await
    }

    async fn read_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        match tokio_fs::read_to_string(self.users_path()).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RecipeRepository for FlatFileStorage {
    async fn fetch_all(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut entries = tokio_fs::read_dir(self.root.join("recipes")).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }
        ids.sort();

        let mut recipes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_recipe(&id).await {
                Ok(recipe) => recipes.push(recipe),
                // deleted between listing and reading
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(recipes)
    }

    async fn get(&self, id: &str) -> Result<Recipe, StoreError> {
        let id = canonical_id(id)?;
        self.read_recipe(&id).await
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        let recipes = self.fetch_all().await?;
        Ok(recipes.into_iter().filter(|r| r.has_tag(tag)).collect())
    }

    async fn insert(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        let recipe = stamp_new(recipe);
        let id = recipe.id.clone().unwrap_or_default();
        self.write_recipe(&id, &recipe).await?;
        tracing::debug!(recipe_id = %id, "recipe written");
        Ok(recipe)
    }

    async fn update(&self, id: &str, patch: Recipe) -> Result<Recipe, StoreError> {
        let id = canonical_id(id)?;
        let lock = self.recipe_lock(&id);
        let _guard = lock.lock().await;

        let mut recipe = self.read_recipe(&id).await?;
        recipe.merge(patch);
        self.write_recipe(&id, &recipe).await?;
        Ok(recipe)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = canonical_id(id)?;
        let lock = self.recipe_lock(&id);
        let _guard = lock.lock().await;

        match tokio_fs::remove_file(self.recipe_path(&id)).await {
            Ok(()) => {
                // waiters still holding the old lock only find NotFound
                self.recipe_locks.remove(&id);
                Ok(())
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UserRepository for FlatFileStorage {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.read_users().await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn put_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let _guard = self.users_lock.lock().await;
        let mut users = self.read_users().await?;
        users.retain(|u| u.username != user.username);
        users.push(user);
        let json = serde_json::to_vec_pretty(&users)?;
        Self::write_atomic(&self.users_path(), json).await
    }
}
