//! Live score stream over server-sent events.
//!
//! A client gets the current score as a `score` event on connect and a
//! `update` event after every successful write to the match. A client that
//! falls behind the channel buffer gets a `lagged` event carrying the number
//! of skipped updates and should refetch the score.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Router, routing::get};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use scorebook_scoring::application::query_handlers;

use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /{match_id}/live
async fn live(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    // Subscribe before reading the score so no write falls between the two.
    let mut updates = state.broadcaster.subscribe(&match_id);
    debug!(%match_id, "live subscriber joined");

    let stream = async_stream::stream! {
        match query_handlers::get_score(&match_id, &state.services).await {
            Ok(score) => yield Event::default().event("score").json_data(&score),
            Err(err) => {
                warn!(%match_id, error = %err, "initial score unavailable");
                yield Event::default()
                    .event("error")
                    .json_data(json!({ "message": err.to_string() }));
            }
        }

        loop {
            match updates.recv().await {
                Ok(update) => yield Event::default().event("update").json_data(&update),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%match_id, skipped, "live subscriber lagged");
                    yield Event::default()
                        .event("lagged")
                        .json_data(json!({ "skipped": skipped }));
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(%match_id, "live stream closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::default().interval(KEEP_ALIVE_INTERVAL))
}

/// Returns the router for the live stream.
pub fn router() -> Router<AppState> {
    Router::new().route("/{match_id}/live", get(live))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use scorebook_event_store::storage::Storage;
    use scorebook_scoring::config::ScoringConfig;
    use scorebook_test_support::FixedClock;
    use tower::ServiceExt;

    use crate::broadcaster::MatchBroadcaster;

    fn test_state() -> AppState {
        AppState::new(
            &Storage::in_memory(),
            Arc::new(MatchBroadcaster::new(8)),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
            ScoringConfig::default(),
        )
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_live_opens_event_stream_and_subscribes() {
        // Arrange
        let state = test_state();
        let app = router().with_state(state.clone());

        // Act
        let response = app.oneshot(get("/m1/live")).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(state.broadcaster.subscriber_count("m1"), 1);
    }

    #[tokio::test]
    async fn test_live_sends_current_score_first() {
        // Arrange
        let app = router().with_state(test_state());
        let response = app.oneshot(get("/m1/live")).await.unwrap();
        let mut body = response.into_body();

        // Act
        let frame = body.frame().await.unwrap().unwrap();

        // Assert
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.starts_with("event: score\n"));
        assert!(text.contains("\"matchId\":\"m1\""));
        assert!(text.contains("\"totalRuns\":0"));
    }

    #[tokio::test]
    async fn test_dropping_the_stream_leaves_the_topic() {
        // Arrange
        let state = test_state();
        let app = router().with_state(state.clone());
        let response = app.oneshot(get("/m1/live")).await.unwrap();

        // Act
        drop(response);

        // Assert
        assert_eq!(state.broadcaster.subscriber_count("m1"), 0);
    }
}
