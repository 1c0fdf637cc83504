// ============================
// crates/backend-lib/src/middleware/rate_limit.rs
// ============================
//! Sign-in throttling keyed on the client address.
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

/// Client address used to key the sign-in throttle.
///
/// The peer address, unless `trust_forwarded` is set, in which case
/// `X-Real-IP` and then the first `X-Forwarded-For` hop take precedence.
pub fn client_ip(request: &Request, trust_forwarded: bool) -> Option<IpAddr> {
    let headers = request.headers();
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    let peer = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    if !trust_forwarded {
        return peer();
    }
    from_header("x-real-ip")
        .or_else(|| from_header("x-forwarded-for"))
        .or_else(peer)
}

/// Reject sign-ins from locked-out clients and count the outcome of the rest
pub async fn throttle_sign_in(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(ip) = client_ip(&request, state.settings.auth.trust_forwarded_headers) else {
        tracing::debug!("no client address, sign-in not throttled");
        return Ok(next.run(request).await);
    };

    if !state.throttle.is_allowed(ip) {
        return Err(AppError::AuthRateLimited);
    }

    let response = next.run(request).await;
    match response.status() {
        StatusCode::UNAUTHORIZED => state.throttle.record_failure(ip),
        status if status.is_success() => state.throttle.record_success(ip),
        _ => {},
    }
    Ok(response)
}
