//! Score computation by full replay.

use std::sync::Arc;

use tracing::instrument;

use scorebook_core::clock::Clock;
use scorebook_core::error::DomainError;
use scorebook_core::projection::Projection;

use crate::application::event_store::EventStore;
use crate::domain::aggregates::{DetailedStats, ScoreState};

/// Folds the active records of a match into its read models.
///
/// Holds no state of its own: every call reads the store and replays.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<EventStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    /// Creates an aggregator reading from `store`.
    #[must_use]
    pub fn new(store: Arc<EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Computes the current score of a match.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the active records cannot be read.
    #[instrument(skip(self))]
    pub async fn compute(&self, match_id: &str) -> Result<ScoreState, DomainError> {
        let active = self.store.active_events(match_id).await?;
        Ok(ScoreState::empty(match_id, self.clock.now()).replay(&active))
    }

    /// Computes the over-by-over breakdown and boundary counts of a match.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the active records cannot be read.
    #[instrument(skip(self))]
    pub async fn detailed_stats(&self, match_id: &str) -> Result<DetailedStats, DomainError> {
        let active = self.store.active_events(match_id).await?;
        Ok(DetailedStats::empty(match_id).replay(&active))
    }
}
