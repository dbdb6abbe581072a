//! Scorebook API — HTTP surface and live score feed.
//!
//! The binary in `main.rs` reads configuration, opens storage, and serves
//! [`app`]. Integration tests build the same router over in-memory storage.

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the full router without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/matches", routes::matches_router())
        .with_state(state)
}
