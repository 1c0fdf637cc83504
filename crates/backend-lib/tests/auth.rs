// ===========================
// crates/backend-lib/tests/auth.rs
// ===========================
mod test_utils;

use axum::http::{header, Method, StatusCode};
use backend_lib::config::AuthStrategyKind;
use serde_json::json;
use test_utils::*;

fn new_recipe() -> serde_json::Value {
    json!({ "name": "Shakshuka", "tags": ["breakfast"] })
}

#[tokio::test]
async fn test_valid_and_invalid_credentials_for_every_strategy() {
    for strategy in [AuthStrategyKind::ApiKey, AuthStrategyKind::Session, AuthStrategyKind::Jwt] {
        let app = app(strategy).await;

        let ok = send(&app, sign_in_request("admin", "password")).await;
        assert_eq!(ok.status, StatusCode::OK, "{strategy}");
        assert!(!ok.body.is_null(), "{strategy}");

        let denied = send(&app, sign_in_request("admin", "wrong")).await;
        assert_eq!(denied.status, StatusCode::UNAUTHORIZED, "{strategy}");
        assert_eq!(denied.body, json!({ "error": "Invalid Username or Password" }));
        assert!(denied.headers.get(header::SET_COOKIE).is_none());

        let unknown = send(&app, sign_in_request("nobody", "password")).await;
        assert_eq!(unknown.body, denied.body);
    }
}

#[tokio::test]
async fn test_malformed_sign_in_body_is_bad_request() {
    let app = app(AuthStrategyKind::Jwt).await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"username\": 42"))
        .unwrap();

    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.error().starts_with("Error while signing in -> "));
}

#[tokio::test]
async fn test_api_key_flow() {
    let app = app(AuthStrategyKind::ApiKey).await;

    let reply = send(&app, sign_in_request("admin", "password")).await;
    assert_eq!(reply.body, json!({ "X-API-KEY": API_KEY }));

    let denied = send(&app, json_request(Method::POST, "/recipes", &new_recipe())).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.error(), "Wrong API key provided");

    let wrong = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "X-API-KEY",
        "not-the-key",
    );
    assert_eq!(send(&app, wrong).await.status, StatusCode::UNAUTHORIZED);

    let allowed = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "X-API-KEY",
        API_KEY,
    );
    assert_eq!(send(&app, allowed).await.status, StatusCode::CREATED);

    // no refresh endpoint for this strategy
    let refresh = send(&app, empty_request(Method::POST, "/refresh")).await;
    assert_eq!(refresh.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_flow() {
    let app = app(AuthStrategyKind::Session).await;

    let reply = send(&app, sign_in_request("admin", "password")).await;
    assert_eq!(reply.body, json!({ "message": "User signed in" }));
    let set_cookie = reply
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(set_cookie.starts_with("user_sessions="));
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let denied = send(&app, json_request(Method::POST, "/recipes", &new_recipe())).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.error(), "User not logged in");

    let allowed = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "cookie",
        &cookie,
    );
    assert_eq!(send(&app, allowed).await.status, StatusCode::CREATED);

    let signed_out = send(&app, with_header(empty_request(Method::POST, "/sign-out"), "cookie", &cookie)).await;
    assert_eq!(signed_out.status, StatusCode::OK);
    assert_eq!(signed_out.body, json!({ "message": "User signed out" }));
    assert!(signed_out.headers.get(header::SET_COOKIE).is_some());

    let after = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "cookie",
        &cookie,
    );
    let after = send(&app, after).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.error(), "User not logged in");
}

#[tokio::test]
async fn test_sign_out_by_get_without_session() {
    let app = app(AuthStrategyKind::Session).await;
    let reply = send(&app, empty_request(Method::GET, "/sign-out")).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_jwt_flow() {
    let app = app(AuthStrategyKind::Jwt).await;

    let reply = send(&app, sign_in_request("admin", "password")).await;
    let token = reply.body["token"].as_str().expect("token").to_string();
    assert!(reply.body["expires"].is_string());

    let denied = send(&app, json_request(Method::POST, "/recipes", &new_recipe())).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let allowed = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "authorization",
        &format!("Bearer {token}"),
    );
    assert_eq!(send(&app, allowed).await.status, StatusCode::CREATED);

    // fresh token is ten minutes from expiry
    let early = send(&app, with_header(empty_request(Method::POST, "/refresh"), "authorization", &token)).await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);
    assert_eq!(early.error(), "Token is not yet eligible for refresh");

    let garbage = send(&app, with_header(empty_request(Method::POST, "/refresh"), "authorization", "abc.def.ghi")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    // stateless: sign-out does not revoke
    send(&app, empty_request(Method::POST, "/sign-out")).await;
    let still = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "authorization",
        &token,
    );
    assert_eq!(send(&app, still).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_jwt_refresh_inside_window() {
    // tokens are born inside the refresh window
    let mut settings = settings(AuthStrategyKind::Jwt);
    settings.auth.token_ttl_secs = 20;
    let app = app_from(settings).await;

    let reply = send(&app, sign_in_request("admin", "password")).await;
    let token = reply.body["token"].as_str().unwrap().to_string();

    let refreshed = send(&app, with_header(empty_request(Method::POST, "/refresh"), "authorization", &token)).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let new_token = refreshed.body["token"].as_str().unwrap();
    assert!(!new_token.is_empty());

    let allowed = with_header(
        json_request(Method::POST, "/recipes", &new_recipe()),
        "authorization",
        new_token,
    );
    assert_eq!(send(&app, allowed).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_sign_in_lockout() {
    let app = app(AuthStrategyKind::Jwt).await;

    for _ in 0..5 {
        let reply = send(&app, from_peer(sign_in_request("admin", "wrong"), [10, 9, 9, 9])).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    // even correct credentials are refused while locked out
    let locked = send(&app, from_peer(sign_in_request("admin", "password"), [10, 9, 9, 9])).await;
    assert_eq!(locked.status, StatusCode::TOO_MANY_REQUESTS);

    let other = send(&app, from_peer(sign_in_request("admin", "password"), [10, 9, 9, 10])).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarding_headers_ignored_without_trusted_proxy() {
    let app = app(AuthStrategyKind::Jwt).await;

    // an attacker claiming the victim's address only locks out itself
    for _ in 0..5 {
        let spoofed = with_header(sign_in_request("admin", "wrong"), "x-real-ip", "10.9.9.20");
        let reply = send(&app, from_peer(spoofed, [10, 9, 9, 66])).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
    let rotated = with_header(sign_in_request("admin", "wrong"), "x-real-ip", "10.9.9.21");
    assert_eq!(send(&app, from_peer(rotated, [10, 9, 9, 66])).await.status, StatusCode::TOO_MANY_REQUESTS);

    let victim = send(&app, from_peer(sign_in_request("admin", "password"), [10, 9, 9, 20])).await;
    assert_eq!(victim.status, StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_proxy_headers_key_the_throttle() {
    let mut settings = settings(AuthStrategyKind::Jwt);
    settings.auth.trust_forwarded_headers = true;
    let app = app_from(settings).await;
    let proxy = [10, 0, 0, 1];

    for _ in 0..5 {
        let behind_proxy = with_header(sign_in_request("admin", "wrong"), "x-forwarded-for", "198.51.100.7");
        let reply = send(&app, from_peer(behind_proxy, proxy)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    let locked = with_header(sign_in_request("admin", "password"), "x-forwarded-for", "198.51.100.7");
    assert_eq!(send(&app, from_peer(locked, proxy)).await.status, StatusCode::TOO_MANY_REQUESTS);

    // other clients behind the same proxy are unaffected
    let other = with_header(sign_in_request("admin", "password"), "x-forwarded-for", "198.51.100.8");
    assert_eq!(send(&app, from_peer(other, proxy)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_reports_strategy() {
    let app = app(AuthStrategyKind::Session).await;
    let reply = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "status": "ok", "auth": "session" }));
}
