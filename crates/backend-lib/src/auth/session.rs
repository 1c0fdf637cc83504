// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Server-side session strategy and session stores.
//!
//! Sign-in stores `{subject, token}` under a fresh random session id and sets
//! that id as a cookie. Authentication fails closed: a missing cookie, a
//! missing or expired entry, and a store error all reject the request.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use deadpool_redis::{redis::AsyncCommands, Pool};
use metrics::{counter, gauge};
use recipebox_common::Credentials;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::strategy::{verify_principal, AuthStrategy, IssuedProof};
use super::token_generator::generate_secure_token;
use super::verifier::CredentialVerifier;
use crate::config::AuthStrategyKind;
use crate::error::AppError;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

const NOT_LOGGED_IN: &str = "User not logged in";

/// Session information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub subject: String,
    /// Sortable unique token minted at sign-in
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("session backend error: {0}")]
    Backend(String),

    #[error("corrupt session record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Where sessions live between requests
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, id: &str, session: &Session, ttl: Duration) -> Result<(), SessionStoreError>;

    /// The live session under `id`, if any
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    async fn remove(&self, id: &str) -> Result<(), SessionStoreError>;
}

/// In-process session store
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Remove expired sessions, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before_count = sessions.len();

        sessions.retain(|_, session| !session.is_expired(now));

        let after_count = sessions.len();
        let removed = before_count - after_count;
        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            tracing::debug!(removed, remaining = after_count, "purged expired sessions");
        }
        gauge!(SESSION_ACTIVE).set(after_count as f64);
        removed
    }

    /// Spawn the periodic cleanup task
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.purge_expired().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, id: &str, session: &Session, _ttl: Duration) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.to_string(), session.clone());
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let now = self.clock.now();
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| !s.is_expired(now)).cloned())
    }

    async fn remove(&self, id: &str) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

/// Sessions in Redis, expired by Redis itself
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: Pool,
}

impl RedisSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn key(id: &str) -> String {
        format!("session:{id}")
    }
}

fn backend<E: std::fmt::Display>(e: E) -> SessionStoreError {
    SessionStoreError::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, id: &str, session: &Session, ttl: Duration) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(session)?;
        let mut conn = self.pool.get().await.map_err(backend)?;
        conn.set_ex::<_, _, ()>(Self::key(id), payload, ttl.as_secs().max(1))
            .await
            .map_err(backend)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let value: Option<String> = conn.get(Self::key(id)).await.map_err(backend)?;
        value
            .map(|v| serde_json::from_str(&v))
            .transpose()
            .map_err(SessionStoreError::from)
    }

    async fn remove(&self, id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        conn.del::<_, ()>(Self::key(id)).await.map_err(backend)
    }
}

/// Cookie-carried server-side sessions
pub struct SessionAuth {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
    cookie_name: String,
    ttl: Duration,
    secure: bool,
}

impl SessionAuth {
    pub fn new(
        store: Arc<dyn SessionStore>,
        verifier: Arc<dyn CredentialVerifier>,
        cookie_name: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            verifier,
            clock: Arc::new(SystemClock),
            cookie_name: cookie_name.into(),
            ttl,
            secure: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mark issued cookies `Secure`
    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

#[async_trait]
impl AuthStrategy for SessionAuth {
    fn kind(&self) -> AuthStrategyKind {
        AuthStrategyKind::Session
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let Some(id) = self.session_id(headers) else {
            return Err(AppError::unauthorized(NOT_LOGGED_IN));
        };

        match self.store.get(&id).await {
            Ok(Some(session)) => {
                tracing::trace!(subject = %session.subject, "session accepted");
                Ok(())
            },
            Ok(None) => Err(AppError::unauthorized(NOT_LOGGED_IN)),
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                Err(AppError::unauthorized(NOT_LOGGED_IN))
            },
        }
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<IssuedProof, AppError> {
        let subject = verify_principal(self.verifier.as_ref(), credentials).await?;

        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("session ttl out of range: {e}")))?;
        let session = Session {
            subject,
            token: Uuid::now_v7().to_string(),
            created_at: now,
            expires_at: now + ttl,
        };
        let id = generate_secure_token();

        self.store
            .put(&id, &session, self.ttl)
            .await
            .map_err(|e| AppError::Internal(format!("Error while saving session -> {e}")))?;
        counter!(SESSION_CREATED).increment(1);

        Ok(IssuedProof::Session(self.cookie(id)))
    }

    async fn sign_out(&self, headers: &HeaderMap) -> Result<Option<Cookie<'static>>, AppError> {
        if let Some(id) = self.session_id(headers) {
            self.store
                .remove(&id)
                .await
                .map_err(|e| AppError::Internal(format!("Error while clearing session -> {e}")))?;
        }

        let mut removal = self.cookie(String::new());
        removal.make_removal();
        Ok(Some(removal))
    }
}
