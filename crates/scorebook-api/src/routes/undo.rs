//! Routes for range undo, redo, preview, and history.

use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use scorebook_core::delivery::DeliveryKey;
use scorebook_core::undo::UndoOperation;
use scorebook_scoring::application::query_handlers::DEFAULT_HISTORY_LIMIT;
use scorebook_scoring::application::undo_redo::{RangePreview, UndoOperationSummary};
use scorebook_scoring::application::{command_handlers, query_handlers};
use scorebook_scoring::domain::aggregates::ScoreState;
use scorebook_scoring::domain::commands;
use scorebook_scoring::domain::intent::DEFAULT_ENTERED_BY;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{match_id}/undo/preview.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Inclusive lower key.
    pub from_key: String,
    /// Inclusive upper key.
    pub to_key: String,
}

/// Request body for POST /{match_id}/undo.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRequest {
    /// Inclusive lower key.
    pub from_key: String,
    /// Inclusive upper key.
    pub to_key: String,
    /// Operator attribution.
    #[serde(default)]
    pub undone_by: Option<String>,
    /// Why the range is retracted.
    #[serde(default)]
    pub reason: String,
}

/// Request body for POST /{match_id}/undo/{operation_id}/redo.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedoRequest {
    /// Operator attribution.
    #[serde(default)]
    pub redone_by: Option<String>,
}

/// Response body for undo and redo.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRedoResponse {
    /// The operation as it now stands.
    pub operation: UndoOperation,
    /// Keys written by this call.
    pub keys: Vec<DeliveryKey>,
    /// The score afterwards.
    pub state: ScoreState,
}

/// Query string for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of operations.
    pub limit: Option<usize>,
}

fn attribution(name: Option<String>) -> String {
    name.map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_ENTERED_BY.to_owned())
}

/// POST /{match_id}/undo/preview
async fn preview(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<RangePreview>, ApiError> {
    let preview = query_handlers::preview_undo(
        &match_id,
        &request.from_key,
        &request.to_key,
        &state.services,
    )
    .await?;
    Ok(Json(preview))
}

/// POST /{match_id}/undo
#[instrument(skip(state, request), fields(from = %request.from_key, to = %request.to_key))]
async fn undo_range(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<UndoRequest>,
) -> Result<Json<UndoRedoResponse>, ApiError> {
    let command = commands::UndoRange {
        correlation_id: Uuid::new_v4(),
        match_id,
        from_key: request.from_key,
        to_key: request.to_key,
        undone_by: attribution(request.undone_by),
        reason: request.reason,
    };

    info!(correlation_id = %command.correlation_id, "handling undo_range command");

    let outcome = command_handlers::handle_undo_range(&command, &state.services).await?;

    Ok(Json(UndoRedoResponse {
        keys: outcome.tombstoned.iter().map(|r| r.key).collect(),
        operation: outcome.operation,
        state: outcome.state,
    }))
}

/// POST /{match_id}/undo/{operation_id}/redo
///
/// The body is optional; a bare POST redoes as the default operator.
#[instrument(skip(state, request))]
async fn redo(
    State(state): State<AppState>,
    Path((match_id, operation_id)): Path<(String, Uuid)>,
    request: Option<Json<RedoRequest>>,
) -> Result<Json<UndoRedoResponse>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let command = commands::RedoUndo {
        correlation_id: Uuid::new_v4(),
        match_id,
        operation_id,
        redone_by: attribution(request.redone_by),
    };

    info!(correlation_id = %command.correlation_id, "handling redo_undo command");

    let outcome = command_handlers::handle_redo_undo(&command, &state.services).await?;

    Ok(Json(UndoRedoResponse {
        keys: outcome.restored.iter().map(|r| r.key).collect(),
        operation: outcome.operation,
        state: outcome.state,
    }))
}

/// GET /{match_id}/undo/history?limit=
async fn history(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<UndoOperationSummary>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let operations = query_handlers::get_undo_history(&match_id, limit, &state.services).await?;
    Ok(Json(operations))
}

/// Returns the router for undo and redo.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{match_id}/undo", post(undo_range))
        .route("/{match_id}/undo/preview", post(preview))
        .route("/{match_id}/undo/history", get(history))
        .route("/{match_id}/undo/{operation_id}/redo", post(redo))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use scorebook_event_store::storage::Storage;
    use scorebook_scoring::config::ScoringConfig;
    use scorebook_test_support::{FailingUndoOperationRepository, FixedClock};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::broadcaster::MatchBroadcaster;

    fn app_with(storage: &Storage) -> Router {
        let state = AppState::new(
            storage,
            Arc::new(MatchBroadcaster::new(8)),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
            ScoringConfig::default(),
        );
        Router::new()
            .merge(router())
            .merge(crate::routes::deliveries::router())
            .with_state(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seed(app: &Router, runs: &[u8]) {
        for (ball, runs) in (1..).zip(runs) {
            let (status, _) = send(
                app,
                "POST",
                "/m1/deliveries",
                &json!({ "over": 1, "ball": ball, "runs": runs }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_preview_reports_runs_to_remove() {
        // Arrange
        let app = app_with(&Storage::in_memory());
        seed(&app, &[1, 4, 0, 2, 6, 1]).await;

        // Act
        let (status, json) = send(
            &app,
            "POST",
            "/m1/undo/preview",
            &json!({ "fromKey": "1.2", "toKey": "1.5" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["runsToRemove"], 12);
        assert_eq!(json["wicketsToRemove"], 0);
        assert_eq!(json["events"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_undo_of_empty_range_returns_404() {
        // Arrange
        let app = app_with(&Storage::in_memory());

        // Act
        let (status, json) = send(
            &app,
            "POST",
            "/m1/undo",
            &json!({ "fromKey": "1.1", "toKey": "1.6" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "empty_range");
    }

    #[tokio::test]
    async fn test_undo_with_reversed_range_returns_400() {
        // Arrange
        let app = app_with(&Storage::in_memory());

        // Act
        let (status, json) = send(
            &app,
            "POST",
            "/m1/undo",
            &json!({ "fromKey": "2.1", "toKey": "1.1" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["field"], "range");
    }

    #[tokio::test]
    async fn test_redo_twice_returns_409() {
        // Arrange
        let app = app_with(&Storage::in_memory());
        seed(&app, &[1, 2]).await;
        let (_, undone) = send(
            &app,
            "POST",
            "/m1/undo",
            &json!({ "fromKey": "1.1", "toKey": "1.2", "undoneBy": "umpire" }),
        )
        .await;
        let operation_id = undone["operation"]["operationId"].as_str().unwrap().to_owned();
        let uri = format!("/m1/undo/{operation_id}/redo");

        // Act
        let (first, _) = send(&app, "POST", &uri, &json!({})).await;
        let (second, json) = send(&app, "POST", &uri, &json!({})).await;

        // Assert
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(json["error"], "already_redone");
    }

    #[tokio::test]
    async fn test_redo_accepts_a_bare_post() {
        // Arrange
        let app = app_with(&Storage::in_memory());
        seed(&app, &[1, 2]).await;
        let (_, undone) = send(
            &app,
            "POST",
            "/m1/undo",
            &json!({ "fromKey": "1.1", "toKey": "1.2" }),
        )
        .await;
        let operation_id = undone["operation"]["operationId"].as_str().unwrap().to_owned();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/m1/undo/{operation_id}/redo"))
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.clone().oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["operation"]["redoneBy"], DEFAULT_ENTERED_BY);
        assert_eq!(json["state"]["totalRuns"], 3);
    }

    #[tokio::test]
    async fn test_redo_of_unknown_operation_returns_404() {
        let app = app_with(&Storage::in_memory());

        let (status, json) = send(
            &app,
            "POST",
            &format!("/m1/undo/{}/redo", Uuid::new_v4()),
            &json!({}),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "operation_not_found");
    }

    #[tokio::test]
    async fn test_operation_log_failure_returns_partial_undo() {
        // Arrange
        let mut storage = Storage::in_memory();
        storage.undo_operations = Arc::new(FailingUndoOperationRepository);
        let app = app_with(&storage);
        seed(&app, &[1, 2]).await;

        // Act
        let (status, json) = send(
            &app,
            "POST",
            "/m1/undo",
            &json!({ "fromKey": "1.1", "toKey": "1.2" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "partial_undo");
        assert_eq!(json["details"]["tombstonedKeys"], json!(["1.1", "1.2"]));
    }

    #[test]
    fn test_blank_attribution_falls_back_to_default() {
        assert_eq!(attribution(Some("  ".to_owned())), DEFAULT_ENTERED_BY);
        assert_eq!(attribution(Some(" umpire ".to_owned())), "umpire");
        assert_eq!(attribution(None), DEFAULT_ENTERED_BY);
    }
}
