//! Route modules. Every match-scoped route takes the match from the path.

pub mod deliveries;
pub mod health;
pub mod live;
pub mod score;
pub mod undo;

use axum::Router;

use crate::state::AppState;

/// All routes under `/api/v1/matches`.
pub fn matches_router() -> Router<AppState> {
    Router::new()
        .merge(deliveries::router())
        .merge(score::router())
        .merge(undo::router())
        .merge(live::router())
}
