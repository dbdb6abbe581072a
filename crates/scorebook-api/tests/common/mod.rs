//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use scorebook_core::clock::Clock;
use scorebook_event_store::storage::Storage;
use scorebook_scoring::config::ScoringConfig;
use scorebook_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

use scorebook_api::broadcaster::MatchBroadcaster;
use scorebook_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Builds the full app router over `storage`, with the same routes as
/// `main.rs`.
pub fn build_app_over(storage: &Storage) -> Router {
    let state = AppState::new(
        storage,
        Arc::new(MatchBroadcaster::new(16)),
        fixed_clock(),
        ScoringConfig::default(),
    );
    scorebook_api::app(state)
}

/// Builds the full app router over fresh in-memory storage.
pub fn build_test_app() -> Router {
    build_app_over(&Storage::in_memory())
}

/// Builds the full app router over `PostgreSQL`.
pub fn build_test_app_with_pool(pool: PgPool) -> Router {
    build_app_over(&Storage::postgres(pool))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Records one delivery and asserts it was accepted.
pub async fn record(
    app: &Router,
    match_id: &str,
    (over, ball, runs, wicket): (u32, u8, u8, bool),
) -> serde_json::Value {
    let (status, json) = post_json(
        app,
        &format!("/api/v1/matches/{match_id}/deliveries"),
        &serde_json::json!({
            "over": over,
            "ball": ball,
            "runs": runs,
            "wicket": wicket,
            "enteredBy": "scorer"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {json}");
    json
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}
