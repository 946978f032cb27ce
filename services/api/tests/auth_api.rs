//! HTTP-level tests for registration, token issuance and route protection.

mod common;

use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, Faults, TestApp};
use study_shield_core::{EntityStore, User};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn register_then_token_then_profile() {
    let app = TestApp::new();
    let (user_id, token) = app.signed_in("ada@example.com").await;

    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["id"], user_id.as_str());
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["coins"], 0);
    assert!(me["last_login"].is_string(), "token exchange records last_login");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.signed_in("dup@example.com").await;

    let response = app
        .post_json(
            "/auth/register",
            None,
            json!({ "name": "Again", "email": "DUP@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Email already registered");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.signed_in("grace@example.com").await;

    let response = app
        .post_json(
            "/auth/token",
            None,
            json!({ "email": "grace@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json(
            "/auth/token",
            None,
            json!({ "email": "nobody@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new();

    let response = app.get("/study-sessions", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = app.get("/study-sessions", Some("forged")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new();
    let (_, token) = app.signed_in("cookie@example.com").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/users/me")
        .header(header::COOKIE, format!("session={token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tokens_expire_and_logout_revokes() {
    let app = TestApp::new();
    let (_, token) = app.signed_in("lin@example.com").await;

    let response = app.post("/auth/logout", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (_, token) = app.signed_in("lin2@example.com").await;
    app.clock.advance(chrono::Duration::days(31));
    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_the_token() {
    let app = TestApp::new();
    let (user_id, old) = app.signed_in("rui@example.com").await;
    app.clock.advance(chrono::Duration::days(20));

    let response = app.post("/auth/refresh", &old).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::SET_COOKIE));
    let new = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(new, old);

    let response = app.get("/users/me", Some(&old)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The fresh token's lifetime starts at the refresh, not the original login.
    app.clock.advance(chrono::Duration::days(20));
    let response = app.get("/users/me", Some(&new)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], user_id.as_str());

    let response = app.send(Method::POST, "/auth/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_store_outage_is_a_server_error() {
    let app = TestApp::with_faults(Faults {
        token_store_down: true,
        ..Faults::default()
    });

    let response = app.get("/users/me", Some("any-token")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert!(!body["error"].as_str().unwrap().contains("connection refused"));

    let response = app.get("/users/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_found_only_at_insert_is_rejected() {
    let app = TestApp::with_faults(Faults {
        hide_existing_emails: true,
        ..Faults::default()
    });
    app.store
        .create_user(User::new("First", "race@example.com", common::t0()), "hash")
        .await
        .unwrap();

    let response = app
        .post_json(
            "/auth/register",
            None,
            json!({ "name": "Second", "email": "race@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Email already registered");
}
