//! HTTP-level tests for the study-session lifecycle.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, TestApp};
use serde_json::json;
use study_shield_core::InactivityMonitor;
use uuid::Uuid;

fn two_tasks() -> serde_json::Value {
    json!({
        "tasks": [
            { "name": "Algebra", "duration": 30 },
            { "name": "Essay", "duration": 30 }
        ],
        "planned_duration": 60
    })
}

async fn start(app: &TestApp, token: &str) -> String {
    let response = app.post_json("/study-sessions", Some(token), two_tasks()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let session = body_json(response).await;
    assert_eq!(session["state"], "running");
    session["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn full_lifecycle_updates_session_and_ledger() {
    let app = TestApp::new();
    let (user_id, token) = app.signed_in("ada@example.com").await;
    let id = start(&app, &token).await;

    let me = body_json(app.get("/users/me", Some(&token)).await).await;
    assert_eq!(me["current_session"], id.as_str());

    let paused = body_json(app.post(&format!("/study-sessions/{id}/pause"), &token).await).await;
    assert_eq!(paused["state"], "paused");

    let response = app.post(&format!("/study-sessions/{id}/pause"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Already paused");

    app.clock.advance(Duration::seconds(120));
    let resumed = body_json(app.post(&format!("/study-sessions/{id}/resume"), &token).await).await;
    assert_eq!(resumed["state"], "running");
    assert_eq!(resumed["total_paused"], 120);

    let response = app
        .post_json(
            &format!("/study-sessions/{id}/complete"),
            Some(&token),
            json!({ "actual_duration": 45, "distractions_blocked": 3, "notes": "solid" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["tasks_completed"], 1);
    assert_eq!(summary["tasks_total"], 2);
    assert_eq!(summary["total_focus_time"], 45);

    let closed = body_json(app.get(&format!("/study-sessions/{id}"), Some(&token)).await).await;
    assert_eq!(closed["state"], "closed");
    assert_eq!(closed["actual_duration"], 45);

    let stats = body_json(app.get(&format!("/users/{user_id}/stats"), Some(&token)).await).await;
    assert_eq!(stats["total_focus_time"], 45);
    assert_eq!(stats["study_stats"].as_array().unwrap().len(), 1);
    assert_eq!(stats["study_stats"][0]["distractions_blocked"], 3);

    let me = body_json(app.get("/users/me", Some(&token)).await).await;
    assert!(me["current_session"].is_null());

    let response = app.post(&format!("/study-sessions/{id}/heartbeat"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Session already completed");
}

#[tokio::test]
async fn ownership_and_identifier_errors() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("owner@example.com").await;
    let (_, other) = app.signed_in("other@example.com").await;
    let id = start(&app, &owner).await;

    let response = app.get(&format!("/study-sessions/{id}"), Some(&other)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get(&format!("/study-sessions/{}", Uuid::new_v4()), Some(&owner))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Session not found");

    let response = app.post("/study-sessions/not-an-id/heartbeat", &owner).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid session ID");
}

#[tokio::test]
async fn list_and_last_active_are_scoped_to_caller() {
    let app = TestApp::new();
    let (_, token) = app.signed_in("ada@example.com").await;
    let (_, other) = app.signed_in("other@example.com").await;

    let first = start(&app, &token).await;
    app.clock.advance(Duration::minutes(5));
    let second = start(&app, &token).await;

    let list = body_json(app.get("/study-sessions", Some(&token)).await).await;
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let active = body_json(app.get("/study-sessions/last-active-session", Some(&token)).await).await;
    assert_eq!(active["id"], second.as_str());

    let none = body_json(app.get("/study-sessions/last-active-session", Some(&other)).await).await;
    assert!(none.is_null());
    let empty = body_json(app.get("/study-sessions", Some(&other)).await).await;
    assert_eq!(empty.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn silent_session_is_auto_paused_and_can_resume() {
    let app = TestApp::new();
    let (_, token) = app.signed_in("ada@example.com").await;
    let id = start(&app, &token).await;

    let monitor = InactivityMonitor::new(app.store.clone(), app.clock.clone());
    app.clock.advance(Duration::seconds(31));
    let report = monitor.sweep_once().await.unwrap();
    assert_eq!(report.paused, 1);

    let session = body_json(app.get(&format!("/study-sessions/{id}"), Some(&token)).await).await;
    assert_eq!(session["state"], "paused");

    app.clock.advance(Duration::seconds(60));
    let resumed = body_json(app.post(&format!("/study-sessions/{id}/resume"), &token).await).await;
    assert_eq!(resumed["state"], "running");
    assert_eq!(resumed["total_paused"], 60);
}
