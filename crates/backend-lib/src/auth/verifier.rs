// ============================
// crates/backend-lib/src/auth/verifier.rs
// ============================
//! Credential verification: does a username/password pair name a principal?
use std::sync::Arc;

use async_trait::async_trait;
use recipebox_common::Credentials;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::password::verify_password;
use crate::error::AppError;
use crate::storage::UserRepository;

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credentials: &Credentials) -> Result<bool, AppError>;
}

/// A single configured username/password pair
pub struct StaticVerifier {
    username: String,
    password: SecretString,
}

impl StaticVerifier {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<bool, AppError> {
        // both halves are always compared
        let user_ok = credentials.username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = credentials
            .password
            .as_bytes()
            .ct_eq(self.password.expose_secret().as_bytes());
        Ok((user_ok & pass_ok).into())
    }
}

/// Users held in the durable store with scrypt hashes
pub struct UserStoreVerifier {
    users: Arc<dyn UserRepository>,
}

impl UserStoreVerifier {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialVerifier for UserStoreVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<bool, AppError> {
        let Some(user) = self.users.find_user(&credentials.username).await? else {
            return Ok(false);
        };

        let plain = Zeroizing::new(credentials.password.clone());
        tokio::task::spawn_blocking(move || verify_password(&user.password_hash, &plain))
            .await
            .map_err(|e| AppError::Internal(format!("password check panicked: {e}")))
    }
}
