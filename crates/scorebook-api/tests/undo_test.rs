//! Integration tests for range undo and redo.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn seed_over_one(app: &axum::Router) {
    for (ball, runs) in [(1, 1), (2, 4), (3, 0), (4, 2), (5, 6), (6, 1)] {
        common::record(app, "m1", (1, ball, runs, false)).await;
    }
}

#[tokio::test]
async fn test_preview_matches_the_undo_it_describes() {
    let app = common::build_test_app();
    seed_over_one(&app).await;

    // Preview 1.2..=1.5
    let (status, preview) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo/preview",
        &json!({ "fromKey": "1.2", "toKey": "1.5" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["runsToRemove"], 12);

    // Preview writes nothing
    let (_, score) = common::get_json(&app, "/api/v1/matches/m1/score").await;
    assert_eq!(score["totalRuns"], 14);

    // Undo the same range
    let (status, undone) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.2", "toKey": "1.5", "undoneBy": "umpire", "reason": "wrong bowler" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(undone["keys"], json!(["1.2", "1.3", "1.4", "1.5"]));
    assert_eq!(undone["state"]["totalRuns"], 2);
    assert_eq!(undone["state"]["overDisplay"], "1.6");
    assert_eq!(undone["operation"]["undoneBy"], "umpire");
}

#[tokio::test]
async fn test_undo_then_redo_restores_the_score() {
    let app = common::build_test_app();
    seed_over_one(&app).await;

    let (_, undone) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.5", "toKey": "1.6" }),
    )
    .await;
    assert_eq!(undone["state"]["totalRuns"], 7);
    assert_eq!(undone["state"]["overDisplay"], "1.4");
    let operation_id = undone["operation"]["operationId"].as_str().unwrap().to_owned();

    let (status, redone) = common::post_json(
        &app,
        &format!("/api/v1/matches/m1/undo/{operation_id}/redo"),
        &json!({ "redoneBy": "umpire" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(redone["keys"], json!(["1.5", "1.6"]));
    assert_eq!(redone["state"]["totalRuns"], 14);
    assert_eq!(redone["state"]["overDisplay"], "1.6");
    assert_eq!(redone["operation"]["redoneBy"], "umpire");

    let (_, active) = common::get_json(&app, "/api/v1/matches/m1/deliveries").await;
    assert_eq!(active[4]["kind"], "restored");
    assert_eq!(active[4]["version"], 3);
}

#[tokio::test]
async fn test_second_redo_is_rejected() {
    let app = common::build_test_app();
    seed_over_one(&app).await;
    let (_, undone) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.1", "toKey": "1.1" }),
    )
    .await;
    let uri = format!(
        "/api/v1/matches/m1/undo/{}/redo",
        undone["operation"]["operationId"].as_str().unwrap()
    );

    let (first, _) = common::post_json(&app, &uri, &json!({})).await;
    let (second, json) = common::post_json(&app, &uri, &json!({})).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already_redone");
    assert!(json["details"]["redoneAt"].is_string());
}

#[tokio::test]
async fn test_redo_under_another_match_is_not_found() {
    let app = common::build_test_app();
    seed_over_one(&app).await;
    let (_, undone) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.1", "toKey": "1.2" }),
    )
    .await;
    let operation_id = undone["operation"]["operationId"].as_str().unwrap();

    let (status, json) = common::post_json(
        &app,
        &format!("/api/v1/matches/m2/undo/{operation_id}/redo"),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "operation_not_found");
}

#[tokio::test]
async fn test_redo_of_unknown_operation_is_not_found() {
    let app = common::build_test_app();

    let (status, _) = common::post_json(
        &app,
        &format!("/api/v1/matches/m1/undo/{}/redo", Uuid::new_v4()),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undoing_an_undone_range_is_empty() {
    let app = common::build_test_app();
    seed_over_one(&app).await;
    let body = json!({ "fromKey": "1.3", "toKey": "1.4" });

    let (first, _) = common::post_json(&app, "/api/v1/matches/m1/undo", &body).await;
    let (second, json) = common::post_json(&app, "/api/v1/matches/m1/undo", &body).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "empty_range");
}

#[tokio::test]
async fn test_history_lists_newest_first() {
    let app = common::build_test_app();
    seed_over_one(&app).await;
    common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.1", "toKey": "1.2" }),
    )
    .await;
    let (_, second) = common::post_json(
        &app,
        "/api/v1/matches/m1/undo",
        &json!({ "fromKey": "1.5", "toKey": "1.6" }),
    )
    .await;
    let second_id = second["operation"]["operationId"].clone();

    let (status, history) = common::get_json(&app, "/api/v1/matches/m1/undo/history").await;

    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["operationId"], second_id);
    assert_eq!(history[0]["runsRemoved"], 7);
    assert_eq!(history[0]["canRedo"], true);
    assert_eq!(history[1]["runsRemoved"], 5);
}
