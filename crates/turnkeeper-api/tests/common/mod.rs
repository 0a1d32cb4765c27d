//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use tower::ServiceExt;
use turnkeeper_test_support::{
    FixedClock, InMemoryParticipantDirectory, InMemoryStateRepository, StaticPermissionOracle,
    fixed_now,
};

use turnkeeper_api::routes;
use turnkeeper_api::state::AppState;

pub const SESSION: &str = "session-1";
pub const GM: &str = "u-gm";

/// Base path for the test channel's initiative.
pub fn initiative_uri(channel_id: &str) -> String {
    format!("/api/v1/sessions/{SESSION}/channels/{channel_id}/initiative")
}

/// App state over in-memory ports: one GM, two player characters and an NPC.
pub fn test_state() -> AppState {
    let directory = InMemoryParticipantDirectory::new()
        .with_entry(SESSION, "pc-aria", "Aria", Some("u-aria"))
        .with_entry(SESSION, "pc-bram", "Bram", Some("u-bram"))
        .with_entry(SESSION, "npc-goblin", "Goblin", None);
    AppState::new(
        Arc::new(FixedClock(fixed_now())),
        Arc::new(InMemoryStateRepository::new()),
        Arc::new(StaticPermissionOracle::new().with_gm(SESSION, GM)),
        Arc::new(directory),
        TimeDelta::seconds(180),
    )
}

/// Build the full app router, the same way `main.rs` does.
pub fn build_test_app(state: AppState) -> Router {
    routes::app(state)
}

/// Send a request with an optional JSON body and return status and JSON body.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body.
pub async fn post_json(
    state: &AppState,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state.clone()), "POST", uri, Some(body)).await
}

/// Send a GET request.
pub async fn get_json(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    send(build_test_app(state.clone()), "GET", uri, None).await
}
