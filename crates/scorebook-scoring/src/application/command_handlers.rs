//! Command handlers for the Scoring context.
//!
//! Each handler performs the write, recomputes the score, and publishes it
//! before releasing the match's write lock, so updates reach subscribers in
//! write order. Nothing is published when the write fails.

use scorebook_core::command::Command;
use scorebook_core::delivery::EventRecord;
use scorebook_core::error::DomainError;
use tracing::instrument;

use crate::application::notifier::Trigger;
use crate::application::services::ScoringServices;
use crate::application::undo_redo::{RedoOutcome, UndoOutcome};
use crate::domain::aggregates::ScoreState;
use crate::domain::commands::{RecordDelivery, RedoUndo, UndoRange};

/// Result of a recorded delivery.
#[derive(Debug, Clone)]
pub struct DeliveryRecorded {
    /// The version written.
    pub record: EventRecord,
    /// Whether it corrected an existing key.
    pub is_correction: bool,
    /// The score after the write.
    pub state: ScoreState,
}

/// Handles the `RecordDelivery` command: appends the next version of the
/// delivery's key, recomputes the match, and publishes the new score.
///
/// # Errors
///
/// Returns `DomainError::Validation` for out-of-range input,
/// `DomainError::Storage` if persistence fails, or
/// `DomainError::RecomputeFailed` if the write landed but the score could
/// not be read back.
#[instrument(skip_all, fields(
    command_type = command.command_type(),
    correlation_id = %command.correlation_id(),
    actor = command.actor(),
))]
pub async fn handle_record_delivery(
    command: &RecordDelivery,
    services: &ScoringServices,
) -> Result<DeliveryRecorded, DomainError> {
    let (applied, guard) = services.store.apply_and_hold(&command.intent).await?;
    let state = services
        .aggregator
        .compute(&applied.record.match_id)
        .await
        .map_err(|e| DomainError::RecomputeFailed {
            match_id: applied.record.match_id.clone(),
            operation_id: None,
            cause: e.to_string(),
        })?;

    services.notifier.publish(
        &state,
        Trigger::Delivery {
            key: applied.record.key,
            is_correction: applied.is_correction,
        },
        Some(&applied.record),
    );
    drop(guard);

    Ok(DeliveryRecorded {
        record: applied.record,
        is_correction: applied.is_correction,
        state,
    })
}

/// Handles the `UndoRange` command: tombstones the range and publishes the
/// new score.
///
/// # Errors
///
/// Returns the errors of [`RangeUndoRedo::undo_range`](crate::application::undo_redo::RangeUndoRedo::undo_range).
#[instrument(skip_all, fields(
    command_type = command.command_type(),
    correlation_id = %command.correlation_id(),
    actor = command.actor(),
))]
pub async fn handle_undo_range(
    command: &UndoRange,
    services: &ScoringServices,
) -> Result<UndoOutcome, DomainError> {
    let (outcome, guard) = services.undo_redo.undo_range_and_hold(command).await?;

    services.notifier.publish(
        &outcome.state,
        Trigger::Undo {
            operation_id: outcome.operation.operation_id,
            keys: outcome.tombstoned.iter().map(|r| r.key).collect(),
        },
        outcome.tombstoned.last(),
    );
    drop(guard);

    Ok(outcome)
}

/// Handles the `RedoUndo` command: restores the captured keys and publishes
/// the new score.
///
/// # Errors
///
/// Returns the errors of [`RangeUndoRedo::redo`](crate::application::undo_redo::RangeUndoRedo::redo).
#[instrument(skip_all, fields(
    command_type = command.command_type(),
    correlation_id = %command.correlation_id(),
    actor = command.actor(),
))]
pub async fn handle_redo_undo(
    command: &RedoUndo,
    services: &ScoringServices,
) -> Result<RedoOutcome, DomainError> {
    let (outcome, guard) = services.undo_redo.redo_and_hold(command).await?;

    services.notifier.publish(
        &outcome.state,
        Trigger::Redo {
            operation_id: outcome.operation.operation_id,
            keys: outcome.restored.iter().map(|r| r.key).collect(),
        },
        outcome.restored.last(),
    );
    drop(guard);

    Ok(outcome)
}
