//! Scorebook API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scorebook_core::error::DomainError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Startup and shutdown errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The storage backend could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Tracing or span export could not be initialised.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Structured context, such as the offending fields or affected keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self.0 {
            DomainError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(json!(
                    violations
                        .iter()
                        .map(|v| json!({ "field": v.field, "constraint": v.constraint }))
                        .collect::<Vec<_>>()
                )),
            ),
            DomainError::EmptyRange { .. } => (StatusCode::NOT_FOUND, "empty_range", None),
            DomainError::OperationNotFound(_) => {
                (StatusCode::NOT_FOUND, "operation_not_found", None)
            }
            DomainError::AlreadyRedone { redone_at, .. } => (
                StatusCode::CONFLICT,
                "already_redone",
                Some(json!({ "redoneAt": redone_at })),
            ),
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict", None)
            }
            DomainError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None),
            DomainError::PartialUndo {
                operation_id,
                tombstoned_keys,
                ..
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_undo",
                Some(json!({
                    "operationId": operation_id,
                    "tombstonedKeys": tombstoned_keys,
                })),
            ),
            DomainError::PartialRedo {
                operation_id,
                restored_keys,
                pending_keys,
                ..
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_redo",
                Some(json!({
                    "operationId": operation_id,
                    "restoredKeys": restored_keys,
                    "pendingKeys": pending_keys,
                })),
            ),
            DomainError::RecomputeFailed { operation_id, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "recompute_failed",
                Some(json!({ "operationId": operation_id })),
            ),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use scorebook_core::error::FieldViolation;
    use uuid::Uuid;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    async fn body_of(err: DomainError) -> Value {
        let response = ApiError(err).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::invalid("ball", "must be between 1 and 6")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_targets_map_to_404() {
        assert_eq!(
            status_of(DomainError::OperationNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::EmptyRange {
                match_id: "m1".into(),
                from_key: "1.1".into(),
                to_key: "1.6".into(),
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_already_redone_maps_to_409() {
        assert_eq!(
            status_of(DomainError::AlreadyRedone {
                operation_id: Uuid::new_v4(),
                redone_at: Utc::now(),
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Storage("connection refused".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_each_field() {
        let body = body_of(DomainError::Validation(vec![
            FieldViolation::new("ball", "must be between 1 and 6, got 7"),
            FieldViolation::new("runs", "must be between 0 and 6, got 9"),
        ]))
        .await;

        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "ball");
        assert_eq!(body["details"][1]["field"], "runs");
    }

    #[tokio::test]
    async fn test_partial_undo_body_names_the_keys() {
        let body = body_of(DomainError::PartialUndo {
            match_id: "m1".into(),
            operation_id: None,
            tombstoned_keys: vec!["1.2".into(), "1.3".into()],
            cause: "storage error: connection refused".into(),
        })
        .await;

        assert_eq!(body["error"], "partial_undo");
        assert_eq!(body["details"]["tombstonedKeys"], json!(["1.2", "1.3"]));
        assert!(body["details"]["operationId"].is_null());
    }

    #[tokio::test]
    async fn test_recompute_failure_body_keeps_the_operation() {
        let operation_id = Uuid::new_v4();
        let body = body_of(DomainError::RecomputeFailed {
            match_id: "m1".into(),
            operation_id: Some(operation_id),
            cause: "storage error: connection refused".into(),
        })
        .await;

        assert_eq!(body["error"], "recompute_failed");
        assert_eq!(body["details"]["operationId"], operation_id.to_string());
    }
}
