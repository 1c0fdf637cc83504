// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;
pub mod recipes;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness check; also reports the active auth strategy
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "auth": state.auth.kind().to_string(),
    }))
}
