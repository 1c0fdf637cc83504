//! Recipe collection endpoints.
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use recipebox_common::{MessageBody, Recipe};
use serde::Deserialize;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub tag: Option<String>,
}

pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.fetch_all().await?))
}

pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    let tag = params
        .tag
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("Missing query parameter: tag"))?;

    Ok(Json(state.recipes.find_by_tag(tag).await?))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, AppError> {
    Ok(Json(state.recipes.fetch_one(&id).await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    payload: Result<Json<Recipe>, JsonRejection>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    let Json(recipe) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let created = state.recipes.create(recipe).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Recipe>, JsonRejection>,
) -> Result<Json<MessageBody>, AppError> {
    let Json(patch) = payload.map_err(|e| {
        AppError::validation(format!("Error while parsing request data -> {}", e.body_text()))
    })?;

    state.recipes.update(&id, patch).await?;
    Ok(Json(MessageBody::new("Recipe has been updated")))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.recipes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
