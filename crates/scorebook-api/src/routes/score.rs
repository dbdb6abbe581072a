//! Routes for the computed score.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};

use scorebook_scoring::application::query_handlers::{self, StatsView};
use scorebook_scoring::domain::aggregates::ScoreState;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{match_id}/score
async fn get_score(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<ScoreState>, ApiError> {
    let score = query_handlers::get_score(&match_id, &state.services).await?;
    Ok(Json(score))
}

/// GET /{match_id}/stats
async fn get_stats(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<StatsView>, ApiError> {
    let stats = query_handlers::get_detailed_stats(&match_id, &state.services).await?;
    Ok(Json(stats))
}

/// Returns the router for score reads.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{match_id}/score", get(get_score))
        .route("/{match_id}/stats", get(get_stats))
}
