//! Query handlers for the Scoring context.
//!
//! Reads never take the match write lock and never publish.

use scorebook_core::delivery::EventRecord;
use scorebook_core::error::DomainError;
use serde::Serialize;

use crate::application::services::ScoringServices;
use crate::application::undo_redo::{RangePreview, UndoOperationSummary};
use crate::domain::aggregates::{DetailedStats, ScoreState};

/// Default cap for the recent-deliveries feed.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Default cap for the undo history.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Serializable view of [`DetailedStats`] with the derived run rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    /// The folded statistics.
    #[serde(flatten)]
    pub stats: DetailedStats,
    /// Runs per six-ball over.
    pub run_rate: f64,
}

/// Current score of a match.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn get_score(
    match_id: &str,
    services: &ScoringServices,
) -> Result<ScoreState, DomainError> {
    services.aggregator.compute(match_id).await
}

/// Over-by-over statistics of a match.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn get_detailed_stats(
    match_id: &str,
    services: &ScoringServices,
) -> Result<StatsView, DomainError> {
    let stats = services.aggregator.detailed_stats(match_id).await?;
    Ok(StatsView {
        run_rate: stats.run_rate(),
        stats,
    })
}

/// The active record of every key, tombstoned ones included, in
/// `(over, ball)` order.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn list_active_deliveries(
    match_id: &str,
    services: &ScoringServices,
) -> Result<Vec<EventRecord>, DomainError> {
    services.store.active_events(match_id).await
}

/// Every version ever written for a match.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn get_audit_log(
    match_id: &str,
    services: &ScoringServices,
) -> Result<Vec<EventRecord>, DomainError> {
    services.store.all_versions(match_id).await
}

/// The most recently written active records.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn get_recent_deliveries(
    match_id: &str,
    limit: usize,
    services: &ScoringServices,
) -> Result<Vec<EventRecord>, DomainError> {
    services.store.recent_by_timestamp(match_id, limit).await
}

/// What an undo of `from_key..=to_key` would remove.
///
/// # Errors
///
/// Returns `DomainError::Validation` for bad keys, or `DomainError::Storage`
/// if the store cannot be read.
pub async fn preview_undo(
    match_id: &str,
    from_key: &str,
    to_key: &str,
    services: &ScoringServices,
) -> Result<RangePreview, DomainError> {
    services.undo_redo.preview(match_id, from_key, to_key).await
}

/// Recent undo operations, newest first.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the operation log cannot be read.
pub async fn get_undo_history(
    match_id: &str,
    limit: usize,
    services: &ScoringServices,
) -> Result<Vec<UndoOperationSummary>, DomainError> {
    services.undo_redo.history(match_id, limit).await
}

/// The records the score is folded from.
///
/// # Errors
///
/// Returns `DomainError::Storage` if the store cannot be read.
pub async fn get_active_non_tombstoned(
    match_id: &str,
    services: &ScoringServices,
) -> Result<Vec<EventRecord>, DomainError> {
    services.undo_redo.active_non_tombstoned(match_id).await
}
