// ===========================
// crates/backend-lib/tests/test_utils/mod.rs
// ===========================
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use backend_lib::{
    auth::build_strategy,
    cache::MemoryCache,
    config::{AuthStrategyKind, CacheBackendKind, Settings, StorageBackend},
    create_router,
    storage::{MemoryStorage, RecipeRepository, StoreError, Stores, UserRepository},
    AppState,
};
use recipebox_common::Recipe;
use serde_json::Value;
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key";
pub const JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

/// In-memory settings for `strategy`
pub fn settings(strategy: AuthStrategyKind) -> Settings {
    let mut settings = Settings::default();
    settings.storage.backend = StorageBackend::Memory;
    settings.cache.backend = CacheBackendKind::Memory;
    settings.auth.strategy = strategy;
    settings.auth.api_key = Some(API_KEY.to_string());
    settings.auth.jwt_secret = Some(JWT_SECRET.to_string());
    settings
}

pub async fn app(strategy: AuthStrategyKind) -> Router {
    app_from(settings(strategy)).await
}

pub async fn app_from(settings: Settings) -> Router {
    let state = AppState::from_settings(settings)
        .await
        .expect("Failed to build app state");
    create_router(state)
}

/// Durable store that counts whole-collection reads
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStorage,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeRepository for CountingStore {
    async fn fetch_all(&self) -> Result<Vec<Recipe>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_all().await
    }
    async fn get(&self, id: &str) -> Result<Recipe, StoreError> {
        self.inner.get(id).await
    }
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        self.inner.find_by_tag(tag).await
    }
    async fn insert(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        self.inner.insert(recipe).await
    }
    async fn update(&self, id: &str, patch: Recipe) -> Result<Recipe, StoreError> {
        self.inner.update(id, patch).await
    }
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

/// Router over an observable store and cache, guarded by the api-key strategy
pub struct Harness {
    pub app: Router,
    pub store: Arc<CountingStore>,
    pub cache: Arc<MemoryCache>,
}

impl Harness {
    pub async fn new() -> Self {
        let settings = settings(AuthStrategyKind::ApiKey);
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryCache::default());
        let users: Arc<dyn UserRepository> = Arc::new(MemoryStorage::new());

        let auth = build_strategy(&settings.auth, users.clone(), None).unwrap();
        let stores = Stores {
            recipes: store.clone(),
            users,
        };
        let state = AppState::with_stores(auth, stores, cache.clone(), settings);
        Self {
            app: create_router(state),
            store,
            cache,
        }
    }

    pub async fn seed(&self, names: &[&str]) -> Vec<Recipe> {
        let mut created = Vec::new();
        for name in names {
            created.push(
                self.store
                    .insert(Recipe {
                        name: name.to_string(),
                        tags: vec!["Dinner".to_string()],
                        ..Recipe::default()
                    })
                    .await
                    .unwrap(),
            );
        }
        created
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        send(&self.app, request).await
    }
}

/// Response status, headers and JSON body (`Null` when empty)
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Reply {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Mark `request` as arriving over a connection from `ip`
pub fn from_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40_000))));
    request
}

pub fn with_header(mut request: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, value.parse().unwrap());
    request
}

pub fn sign_in_request(username: &str, password: &str) -> Request<Body> {
    json_request(
        Method::POST,
        "/sign-in",
        &serde_json::json!({ "username": username, "password": password }),
    )
}
