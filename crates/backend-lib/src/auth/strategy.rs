// ============================
// crates/backend-lib/src/auth/strategy.rs
// ============================
//! The contract every credential scheme implements.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use metrics::counter;
use recipebox_common::{Credentials, MessageBody, TokenOutput};
use zeroize::Zeroize;

use super::verifier::CredentialVerifier;
use crate::config::AuthStrategyKind;
use crate::error::AppError;
use crate::metrics::{SIGN_IN_FAILURE, SIGN_IN_SUCCESS};

/// Proof of identity handed to the client after a successful sign-in
#[derive(Debug)]
pub enum IssuedProof {
    /// The static key, echoed back under its header name
    ApiKey(String),
    /// A signed token and its expiry
    Token(TokenOutput),
    /// A session cookie
    Session(Cookie<'static>),
}

impl IntoResponse for IssuedProof {
    fn into_response(self) -> Response {
        match self {
            IssuedProof::ApiKey(key) => {
                Json(HashMap::from([(super::API_KEY_HEADER, key)])).into_response()
            },
            IssuedProof::Token(output) => Json(output).into_response(),
            IssuedProof::Session(cookie) => (
                CookieJar::new().add(cookie),
                Json(MessageBody::new("User signed in")),
            )
                .into_response(),
        }
    }
}

/// A pluggable authentication scheme. Exactly one is active per process.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn kind(&self) -> AuthStrategyKind;

    /// Decide whether a request to a protected route may proceed
    async fn authenticate(&self, headers: &HeaderMap) -> Result<(), AppError>;

    async fn sign_in(&self, credentials: Credentials) -> Result<IssuedProof, AppError>;

    /// Drop any server-side state for the caller. Returns a removal cookie
    /// when the client should forget one.
    async fn sign_out(&self, headers: &HeaderMap) -> Result<Option<Cookie<'static>>, AppError>;

    /// Present only for schemes whose proofs can be renewed
    fn refresher(self: Arc<Self>) -> Option<Arc<dyn TokenRefresher>> {
        None
    }
}

/// Renewal of a still-valid proof shortly before it lapses
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, headers: &HeaderMap) -> Result<IssuedProof, AppError>;
}

/// Run the verifier and wipe the password whatever the outcome.
///
/// Returns the verified username.
pub(crate) async fn verify_principal(
    verifier: &dyn CredentialVerifier,
    mut credentials: Credentials,
) -> Result<String, AppError> {
    let outcome = verifier.verify(&credentials).await;
    credentials.password.zeroize();

    match outcome {
        Ok(true) => {
            counter!(SIGN_IN_SUCCESS).increment(1);
            tracing::info!(username = %credentials.username, "user signed in");
            Ok(credentials.username)
        },
        Ok(false) => {
            counter!(SIGN_IN_FAILURE).increment(1);
            tracing::info!(username = %credentials.username, "rejected sign-in");
            Err(AppError::InvalidCredentials)
        },
        Err(e) => {
            counter!(SIGN_IN_FAILURE).increment(1);
            Err(e)
        },
    }
}
