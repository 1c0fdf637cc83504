//! Sign-in, sign-out and token refresh.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use recipebox_common::{Credentials, MessageBody};

use crate::auth::{IssuedProof, TokenRefresher};
use crate::error::AppError;
use crate::AppState;

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<IssuedProof, AppError> {
    let Json(credentials) = payload.map_err(|e| {
        AppError::validation(format!("Error while signing in -> {}", e.body_text()))
    })?;

    state.auth.sign_in(credentials).await
}

pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<MessageBody>), AppError> {
    let jar = match state.auth.sign_out(&headers).await? {
        Some(removal) => CookieJar::new().add(removal),
        None => CookieJar::new(),
    };
    Ok((jar, Json(MessageBody::new("User signed out"))))
}

/// Routed with the active strategy's refresher as its state
pub async fn refresh(
    State(refresher): State<Arc<dyn TokenRefresher>>,
    headers: HeaderMap,
) -> Result<IssuedProof, AppError> {
    refresher.refresh(&headers).await
}
