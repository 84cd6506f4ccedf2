//! Router-level tests

use std::net::{IpAddr, SocketAddr};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use platform::rate_limit::RateLimitConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::support::Harness;
use crate::application::AuthConfig;
use crate::presentation::router::auth_router_generic;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Attach the socket peer the way `into_make_service_with_connect_info` does
fn from_peer(mut req: Request<Body>, peer: [u8; 4]) -> Request<Body> {
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 51000))));
    req
}

fn unknown_login() -> Request<Body> {
    post_json(
        "/auth/login",
        json!({"email": "nobody@b.com", "password": "Abcdef12"}),
    )
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_google_account_password_login_is_rejected() {
    let h = Harness::new();
    h.google_user("g@b.com").await;
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "g@b.com", "password": "Whatever1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_PROVIDER_MISMATCH");
    assert_eq!(body["provider"], "google");
}

#[tokio::test]
async fn test_signup_then_activate_over_http() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .clone()
        .oneshot(post_json(
            "/signup",
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "a@b.com",
                "password": "Abcdef12",
                "confirmPassword": "Abcdef12"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect"], "/activate?email=a%40b.com");

    let code = h.mailer.last_code_for("a@b.com").unwrap();
    let response = app
        .oneshot(post_json(
            "/activate",
            json!({"email": "a@b.com", "code": code}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 3);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["user"]["isActive"], true);
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(post_json("/signup", json!({"email": "a@b.com"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "MISSING_FIELDS");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_sets_cookies_and_echoes_tokens() {
    let h = Harness::new();
    h.active_email_user("a@b.com", "Abcdef12").await;
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "a@b.com", "password": "Abcdef12"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    let body = json_body(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_anonymous_session_check() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app.oneshot(get("/auth/session")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], false);
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn test_logout_without_session_clears_cookies() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(json_body(response).await, json!({"success": true}));
}

#[tokio::test]
async fn test_refresh_without_cookie_is_session_expired() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(set_cookies(&response).len(), 3);
    assert_eq!(json_body(response).await["code"], "SESSION_EXPIRED");
}

#[tokio::test]
async fn test_me_requires_auth() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app.clone().oneshot(get("/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    h.active_email_user("a@b.com", "Abcdef12").await;
    let login = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "a@b.com", "password": "Abcdef12"}),
        ))
        .await
        .unwrap();
    let token = json_body(login).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["email"], "a@b.com");
}

#[tokio::test]
async fn test_google_start_redirects_with_session_cookie() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(get("/auth/google?intent=signup"))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(location.starts_with("https://accounts.example/auth?state="));
    assert_eq!(set_cookies(&response).len(), 1);
}

#[tokio::test]
async fn test_google_callback_without_session_redirects_to_login() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let response = app
        .oneshot(get("/auth/google/callback?code=x&state=y"))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(location, "http://localhost:40922/login?error=invalid_state");
}

async fn login_statuses(app: &Router, requests: Vec<Request<Body>>) -> Vec<StatusCode> {
    let mut statuses = Vec::new();
    for req in requests {
        statuses.push(app.clone().oneshot(req).await.unwrap().status());
    }
    statuses
}

#[tokio::test]
async fn test_login_rate_limit_returns_429_with_retry_after() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let requests = (0..10)
        .map(|_| from_peer(unknown_login(), [198, 51, 100, 7]))
        .collect();
    let statuses = login_statuses(&app, requests).await;
    assert!(statuses.iter().all(|s| *s == StatusCode::UNAUTHORIZED));

    let response = app
        .clone()
        .oneshot(from_peer(unknown_login(), [198, 51, 100, 7]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RATE_LIMITED");

    // Another address has its own window.
    let other = app
        .oneshot(from_peer(unknown_login(), [198, 51, 100, 8]))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_login_window() {
    let h = Harness::new();
    let app = auth_router_generic(h.state());

    let requests = (0..12)
        .map(|i| {
            let mut req = from_peer(unknown_login(), [198, 51, 100, 7]);
            req.headers_mut().insert(
                "x-forwarded-for",
                format!("10.0.0.{i}").parse().unwrap(),
            );
            req
        })
        .collect();
    let statuses = login_statuses(&app, requests).await;

    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_trusted_proxy_limits_each_forwarded_client() {
    let h = Harness::with_config(AuthConfig {
        login_rate_limit: RateLimitConfig::new(2, 60),
        trusted_proxies: vec![IpAddr::from([127, 0, 0, 1])],
        ..AuthConfig::development()
    });
    let app = auth_router_generic(h.state());

    let behind_proxy = |client: &str| {
        let mut req = from_peer(unknown_login(), [127, 0, 0, 1]);
        req.headers_mut().insert(
            "x-forwarded-for",
            format!("6.6.6.6, {client}").parse().unwrap(),
        );
        req
    };

    let first = login_statuses(
        &app,
        vec![
            behind_proxy("203.0.113.1"),
            behind_proxy("203.0.113.1"),
            behind_proxy("203.0.113.1"),
        ],
    )
    .await;
    assert_eq!(
        first,
        vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );

    let second = login_statuses(&app, vec![behind_proxy("203.0.113.2")]).await;
    assert_eq!(second, vec![StatusCode::UNAUTHORIZED]);
}

#[tokio::test]
async fn test_session_check_limits_only_anonymous_callers() {
    let h = Harness::with_config(AuthConfig {
        session_rate_limit: RateLimitConfig::new(2, 60),
        ..AuthConfig::development()
    });
    h.active_email_user("a@b.com", "Abcdef12").await;
    let app = auth_router_generic(h.state());
    let peer = [198, 51, 100, 9];

    let login = app
        .clone()
        .oneshot(from_peer(
            post_json(
                "/auth/login",
                json!({"email": "a@b.com", "password": "Abcdef12"}),
            ),
            peer,
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let sid = set_cookies(&login)
        .into_iter()
        .find(|c| c.starts_with("sid="))
        .and_then(|c| c.split(';').next().map(str::to_string))
        .unwrap();

    for _ in 0..5 {
        let req = Request::builder()
            .uri("/auth/session")
            .header(header::COOKIE, &sid)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(from_peer(req, peer)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["authenticated"], true);
    }

    let mut anonymous = Vec::new();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(from_peer(get("/auth/session"), peer))
            .await
            .unwrap();
        anonymous.push(response.status());
    }
    assert_eq!(
        anonymous,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
}
