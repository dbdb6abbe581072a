//! Routes for recording deliveries and reading the ledger.

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use scorebook_core::delivery::EventRecord;
use scorebook_scoring::application::query_handlers::DEFAULT_RECENT_LIMIT;
use scorebook_scoring::application::{command_handlers, query_handlers};
use scorebook_scoring::domain::aggregates::ScoreState;
use scorebook_scoring::domain::commands;
use scorebook_scoring::domain::intent::DeliveryIntent;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{match_id}/deliveries. Numbers are accepted wide
/// so that out-of-range values get a field-level validation error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDeliveryRequest {
    /// Over number.
    pub over: i64,
    /// Ball number within the over.
    pub ball: i64,
    /// Runs scored.
    pub runs: i64,
    /// Whether a wicket fell.
    #[serde(default)]
    pub wicket: bool,
    /// Who entered the delivery.
    #[serde(default)]
    pub entered_by: Option<String>,
}

/// Response body for a recorded delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDeliveryResponse {
    /// The version written.
    pub record: EventRecord,
    /// Whether it corrected an existing key.
    pub is_correction: bool,
    /// The score after the write.
    pub state: ScoreState,
}

/// Query string for the recent-deliveries feed.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Maximum number of records.
    pub limit: Option<usize>,
}

/// POST /{match_id}/deliveries
#[instrument(skip(state, request))]
async fn record_delivery(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<RecordDeliveryRequest>,
) -> Result<Json<RecordDeliveryResponse>, ApiError> {
    let command = commands::RecordDelivery {
        correlation_id: Uuid::new_v4(),
        intent: DeliveryIntent {
            match_id: Some(match_id),
            over: request.over,
            ball: request.ball,
            runs: request.runs,
            wicket: request.wicket,
            entered_by: request.entered_by,
        },
    };

    info!(correlation_id = %command.correlation_id, "handling record_delivery command");

    let recorded = command_handlers::handle_record_delivery(&command, &state.services).await?;

    Ok(Json(RecordDeliveryResponse {
        record: recorded.record,
        is_correction: recorded.is_correction,
        state: recorded.state,
    }))
}

/// GET /{match_id}/deliveries
async fn list_active(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let records = query_handlers::list_active_deliveries(&match_id, &state.services).await?;
    Ok(Json(records))
}

/// GET /{match_id}/deliveries/scoring
async fn scoring_input(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let records = query_handlers::get_active_non_tombstoned(&match_id, &state.services).await?;
    Ok(Json(records))
}

/// GET /{match_id}/deliveries/audit
async fn audit_log(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let records = query_handlers::get_audit_log(&match_id, &state.services).await?;
    Ok(Json(records))
}

/// GET /{match_id}/deliveries/recent?limit=
async fn recent(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let records = query_handlers::get_recent_deliveries(&match_id, limit, &state.services).await?;
    Ok(Json(records))
}

/// Returns the router for the delivery ledger.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{match_id}/deliveries",
            get(list_active).post(record_delivery),
        )
        .route("/{match_id}/deliveries/scoring", get(scoring_input))
        .route("/{match_id}/deliveries/audit", get(audit_log))
        .route("/{match_id}/deliveries/recent", get(recent))
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
    use scorebook_test_support::{FailingDeliveryRepository, FixedClock};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::broadcaster::MatchBroadcaster;

    fn app_state_with(storage: &Storage) -> AppState {
        AppState::new(
            storage,
            Arc::new(MatchBroadcaster::new(8)),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
            ScoringConfig::default(),
        )
    }

    fn test_app() -> Router {
        router().with_state(app_state_with(&Storage::in_memory()))
    }

    fn failing_app() -> Router {
        let mut storage = Storage::in_memory();
        storage.deliveries = Arc::new(FailingDeliveryRepository);
        router().with_state(app_state_with(&storage))
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_record_delivery_returns_record_and_state() {
        // Arrange
        let app = test_app();
        let body = serde_json::json!({ "over": 4, "ball": 2, "runs": 6, "enteredBy": "scorer" });

        // Act
        let response = app.oneshot(post("/m1/deliveries", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["isCorrection"], false);
        assert_eq!(json["record"]["key"], "4.2");
        assert_eq!(json["record"]["kind"], "new");
        assert_eq!(json["record"]["version"], 1);
        assert_eq!(json["record"]["matchId"], "m1");
        assert_eq!(json["state"]["totalRuns"], 6);
        assert_eq!(json["state"]["overDisplay"], "4.2");
    }

    #[tokio::test]
    async fn test_record_delivery_rejects_out_of_range_ball() {
        // Arrange
        let app = test_app();
        let body = serde_json::json!({ "over": 1, "ball": 7, "runs": 0 });

        // Act
        let response = app.oneshot(post("/m1/deliveries", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_of(response).await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "ball");
    }

    #[tokio::test]
    async fn test_record_delivery_returns_500_on_storage_failure() {
        // Arrange
        let app = failing_app();
        let body = serde_json::json!({ "over": 1, "ball": 1, "runs": 0 });

        // Act
        let response = app.oneshot(post("/m1/deliveries", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["error"], "storage_error");
    }

    #[tokio::test]
    async fn test_scoring_input_omits_tombstoned_keys() {
        // Arrange
        let state = app_state_with(&Storage::in_memory());
        let app = router().with_state(state.clone());
        for ball in 1..=2 {
            let body = serde_json::json!({ "over": 1, "ball": ball, "runs": 1 });
            let response = app.clone().oneshot(post("/m1/deliveries", &body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        state
            .services
            .undo_redo
            .undo_range(&commands::UndoRange {
                correlation_id: Uuid::new_v4(),
                match_id: "m1".to_owned(),
                from_key: "1.2".to_owned(),
                to_key: "1.2".to_owned(),
                undone_by: "umpire".to_owned(),
                reason: String::new(),
            })
            .await
            .unwrap();
        let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        // Act
        let active = json_of(app.clone().oneshot(get("/m1/deliveries")).await.unwrap()).await;
        let scoring = json_of(app.oneshot(get("/m1/deliveries/scoring")).await.unwrap()).await;

        // Assert
        assert_eq!(active.as_array().unwrap().len(), 2);
        assert_eq!(active[1]["kind"], "tombstoned");
        assert_eq!(scoring.as_array().unwrap().len(), 1);
        assert_eq!(scoring[0]["key"], "1.1");
    }

    #[tokio::test]
    async fn test_record_delivery_rejects_missing_fields() {
        // Arrange
        let app = test_app();
        let body = serde_json::json!({ "over": 1 });

        // Act
        let response = app.oneshot(post("/m1/deliveries", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
