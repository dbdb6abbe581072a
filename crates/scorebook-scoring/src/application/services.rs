//! Wiring of the scoring services.

use std::sync::Arc;

use scorebook_core::clock::Clock;
use scorebook_core::notifier::Notifier;
use scorebook_core::repository::{DeliveryRepository, UndoOperationRepository};

use crate::application::aggregator::Aggregator;
use crate::application::event_store::EventStore;
use crate::application::notifier::{ChangeNotifier, ScoreUpdate};
use crate::application::undo_redo::RangeUndoRedo;
use crate::config::ScoringConfig;

/// Every scoring service, built once over the injected collaborators and
/// shared by the command and query handlers.
#[derive(Debug, Clone)]
pub struct ScoringServices {
    /// Versioned delivery store.
    pub store: Arc<EventStore>,
    /// Score computation.
    pub aggregator: Aggregator,
    /// Range undo and redo.
    pub undo_redo: RangeUndoRedo,
    /// Publication of recomputed scores.
    pub notifier: ChangeNotifier,
}

impl ScoringServices {
    /// Builds the services. The same write locks guard direct deliveries and
    /// bulk undo/redo because both go through the one `EventStore`.
    #[must_use]
    pub fn new(
        deliveries: Arc<dyn DeliveryRepository>,
        undo_operations: Arc<dyn UndoOperationRepository>,
        notifier: Arc<dyn Notifier<ScoreUpdate>>,
        clock: Arc<dyn Clock>,
        config: ScoringConfig,
    ) -> Self {
        let store = Arc::new(EventStore::new(deliveries, Arc::clone(&clock), config));
        let aggregator = Aggregator::new(Arc::clone(&store), Arc::clone(&clock));
        let undo_redo = RangeUndoRedo::new(
            Arc::clone(&store),
            undo_operations,
            aggregator.clone(),
            clock,
            config,
        );
        Self {
            store,
            aggregator,
            undo_redo,
            notifier: ChangeNotifier::new(notifier),
        }
    }
}
