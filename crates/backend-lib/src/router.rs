// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::CorsSettings;
use crate::handlers::{self, auth, recipes};
use crate::middleware::{require_auth, throttle_sign_in};
use crate::AppState;

/// Build the application router.
///
/// `/refresh` is only mounted when the active strategy can refresh proofs.
pub fn create_router(state: AppState) -> Router {
    let gate = || from_fn_with_state(state.clone(), require_auth);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/sign-in",
            post(auth::sign_in).layer(from_fn_with_state(state.clone(), throttle_sign_in)),
        )
        .route("/sign-out", post(auth::sign_out).get(auth::sign_out))
        .route(
            "/recipes",
            get(recipes::list_recipes).merge(post(recipes::create_recipe).layer(gate())),
        )
        .route("/recipes/search", get(recipes::search_recipes))
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe).merge(
                patch(recipes::update_recipe)
                    .put(recipes::update_recipe)
                    .delete(recipes::delete_recipe)
                    .layer(gate()),
            ),
        );

    if let Some(refresher) = state.auth.clone().refresher() {
        router = router.route("/refresh", post(auth::refresh).with_state(refresher));
    }

    router
        .layer(cors_layer(&state.settings.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(settings.max_age_secs))
}
