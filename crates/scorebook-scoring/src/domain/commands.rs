//! Commands for the Scoring context.

use scorebook_core::command::Command;
use uuid::Uuid;

use super::intent::{DEFAULT_ENTERED_BY, DeliveryIntent};

/// Command to record a delivery, or correct it if the key already exists.
#[derive(Debug, Clone)]
pub struct RecordDelivery {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The unvalidated delivery.
    pub intent: DeliveryIntent,
}

/// Command to tombstone every active delivery in an inclusive key range.
#[derive(Debug, Clone)]
pub struct UndoRange {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The match whose deliveries are retracted.
    pub match_id: String,
    /// Inclusive lower key, `"over.ball"`.
    pub from_key: String,
    /// Inclusive upper key, `"over.ball"`.
    pub to_key: String,
    /// Operator attribution.
    pub undone_by: String,
    /// Why the range is being retracted.
    pub reason: String,
}

/// Command to reinstate the deliveries retracted by an earlier undo.
#[derive(Debug, Clone)]
pub struct RedoUndo {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The match the operation must belong to.
    pub match_id: String,
    /// The undo operation to reverse.
    pub operation_id: Uuid,
    /// Operator attribution.
    pub redone_by: String,
}

impl Command for RecordDelivery {
    fn command_type(&self) -> &'static str {
        "scoring.record_delivery"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &str {
        self.intent
            .entered_by
            .as_deref()
            .unwrap_or(DEFAULT_ENTERED_BY)
    }
}

impl Command for UndoRange {
    fn command_type(&self) -> &'static str {
        "scoring.undo_range"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &str {
        &self.undone_by
    }
}

impl Command for RedoUndo {
    fn command_type(&self) -> &'static str {
        "scoring.redo_undo"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &str {
        &self.redone_by
    }
}
