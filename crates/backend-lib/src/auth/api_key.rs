//! Static API key strategy.
//!
//! Protected requests must carry the configured key in `X-API-KEY`. Sign-in
//! verifies the principal and hands the key back. Nothing is stored, so
//! sign-out has nothing to undo.
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::Cookie;
use recipebox_common::Credentials;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::strategy::{verify_principal, AuthStrategy, IssuedProof};
use super::verifier::CredentialVerifier;
use super::API_KEY_HEADER;
use crate::config::AuthStrategyKind;
use crate::error::AppError;

const WRONG_KEY: &str = "Wrong API key provided";

pub struct ApiKeyAuth {
    key: SecretString,
    verifier: Arc<dyn CredentialVerifier>,
}

impl ApiKeyAuth {
    pub fn new(key: SecretString, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { key, verifier }
    }
}

#[async_trait]
impl AuthStrategy for ApiKeyAuth {
    fn kind(&self) -> AuthStrategyKind {
        AuthStrategyKind::ApiKey
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let presented = headers
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if bool::from(presented.ct_eq(self.key.expose_secret().as_bytes())) {
            Ok(())
        } else {
            Err(AppError::unauthorized(WRONG_KEY))
        }
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<IssuedProof, AppError> {
        verify_principal(self.verifier.as_ref(), credentials).await?;
        Ok(IssuedProof::ApiKey(self.key.expose_secret().to_string()))
    }

    async fn sign_out(&self, _headers: &HeaderMap) -> Result<Option<Cookie<'static>>, AppError> {
        Ok(None)
    }
}
