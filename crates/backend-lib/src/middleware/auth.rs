//! Authentication gate for protected routes.
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::counter;

use crate::error::AppError;
use crate::metrics::GATE_REJECTED;
use crate::AppState;

/// Run the active strategy's check; a rejection never reaches the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = state.auth.authenticate(request.headers()).await {
        counter!(GATE_REJECTED).increment(1);
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "request rejected by auth gate"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
