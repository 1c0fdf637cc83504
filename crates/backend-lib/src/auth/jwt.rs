// ============================
// crates/backend-lib/src/auth/jwt.rs
// ============================
//! Stateless signed-token strategy (HS256).
//!
//! Tokens carry `{username, iat, exp}`. The signature is checked by
//! `jsonwebtoken`; expiry is checked against our own [`Clock`] so tests can
//! move time. Refresh is only granted in the last `refresh_window` before
//! expiry.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use recipebox_common::{Credentials, TokenOutput};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::strategy::{verify_principal, AuthStrategy, IssuedProof, TokenRefresher};
use super::verifier::CredentialVerifier;
use crate::config::AuthStrategyKind;
use crate::error::AppError;
use crate::metrics::TOKEN_REFRESHED;

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Token lifetimes
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub ttl: Duration,
    pub refresh_window: Duration,
    pub refreshed_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            refresh_window: Duration::from_secs(30),
            refreshed_ttl: Duration::from_secs(5 * 60),
        }
    }
}

pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    verifier: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

impl JwtAuth {
    pub fn new(secret: &SecretString, verifier: Arc<dyn CredentialVerifier>, policy: TokenPolicy) -> Self {
        let secret = secret.expose_secret().as_bytes();

        // signature only; expiry is checked against our clock
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            verifier,
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mint a token for `username` valid for `ttl` from now
    pub fn mint(&self, username: &str, ttl: Duration) -> Result<TokenOutput, AppError> {
        let iat = self.clock.now().timestamp();
        let exp = iat.saturating_add(secs(ttl));
        let claims = Claims {
            username: username.to_string(),
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Error while signing token -> {e}")))?;
        let expires = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| AppError::Internal(format!("token expiry {exp} out of range")))?;

        Ok(TokenOutput { token, expires })
    }

    /// Check signature and expiry, returning the claims and seconds left
    pub fn validate(&self, token: &str) -> Result<(Claims, i64), AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::unauthorized(format!("Error while parsing token -> {e}"))
        })?;

        let remaining = data.claims.exp - self.clock.now().timestamp();
        if remaining <= 0 {
            return Err(AppError::unauthorized("Token has expired"));
        }
        Ok((data.claims, remaining))
    }
}

/// Raw token from `Authorization`, with or without a `Bearer ` prefix
fn bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing token"))?;

    Ok(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}

#[async_trait]
impl AuthStrategy for JwtAuth {
    fn kind(&self) -> AuthStrategyKind {
        AuthStrategyKind::Jwt
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<(), AppError> {
        self.validate(bearer(headers)?).map(|_| ())
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<IssuedProof, AppError> {
        let username = verify_principal(self.verifier.as_ref(), credentials).await?;
        Ok(IssuedProof::Token(self.mint(&username, self.policy.ttl)?))
    }

    async fn sign_out(&self, _headers: &HeaderMap) -> Result<Option<Cookie<'static>>, AppError> {
        Ok(None)
    }

    fn refresher(self: Arc<Self>) -> Option<Arc<dyn TokenRefresher>> {
        Some(self)
    }
}

#[async_trait]
impl TokenRefresher for JwtAuth {
    async fn refresh(&self, headers: &HeaderMap) -> Result<IssuedProof, AppError> {
        let (claims, remaining) = self.validate(bearer(headers)?)?;
        if remaining > secs(self.policy.refresh_window) {
            return Err(AppError::RefreshNotEligible);
        }

        let output = self.mint(&claims.username, self.policy.refreshed_ttl)?;
        counter!(TOKEN_REFRESHED).increment(1);
        tracing::info!(username = %claims.username, "token refreshed");
        Ok(IssuedProof::Token(output))
    }
}
