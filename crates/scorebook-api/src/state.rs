//! Shared application state.

use std::sync::Arc;

use scorebook_core::clock::Clock;
use scorebook_event_store::storage::Storage;
use scorebook_scoring::application::services::ScoringServices;
use scorebook_scoring::config::ScoringConfig;

use crate::broadcaster::MatchBroadcaster;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Scoring services over the opened storage.
    pub services: ScoringServices,
    /// Live score topics; also the services' notifier.
    pub broadcaster: Arc<MatchBroadcaster>,
    /// Name of the storage backend, reported by the health check.
    pub storage_kind: &'static str,
}

impl AppState {
    /// Wires the scoring services to `storage`, publishing through
    /// `broadcaster`.
    #[must_use]
    pub fn new(
        storage: &Storage,
        broadcaster: Arc<MatchBroadcaster>,
        clock: Arc<dyn Clock>,
        config: ScoringConfig,
    ) -> Self {
        let services = ScoringServices::new(
            Arc::clone(&storage.deliveries),
            Arc::clone(&storage.undo_operations),
            broadcaster.clone(),
            clock,
            config,
        );
        Self {
            services,
            broadcaster,
            storage_kind: storage.kind(),
        }
    }
}
