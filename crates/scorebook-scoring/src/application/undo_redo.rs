//! Reversible bulk retraction of delivery ranges.
//!
//! An undo tombstones every active delivery in a key range and logs the
//! exact key set with its pre-tombstone values. A redo replays that log as
//! `restored` versions. Neither ever re-derives the range, so redo touches
//! only the keys captured at undo time.
//!
//! The store has no rollback, so a failure part-way through is reported as
//! `PartialUndo` or `PartialRedo` with the keys on each side of the failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use scorebook_core::clock::Clock;
use scorebook_core::delivery::{DeliveryKey, EventRecord};
use scorebook_core::error::DomainError;
use scorebook_core::repository::UndoOperationRepository;
use scorebook_core::undo::{AffectedEvent, KeyRange, UndoOperation};

use crate::application::aggregator::Aggregator;
use crate::application::event_store::EventStore;
use crate::application::locks::MatchGuard;
use crate::config::ScoringConfig;
use crate::domain::aggregates::ScoreState;
use crate::domain::commands::{RedoUndo, UndoRange};
use crate::domain::range::{parse_range, select_range};

/// Outcome of [`RangeUndoRedo::undo_range`].
#[derive(Debug, Clone)]
pub struct UndoOutcome {
    /// The logged operation.
    pub operation: UndoOperation,
    /// The tombstone versions written, in `(over, ball)` order.
    pub tombstoned: Vec<EventRecord>,
    /// The score after the undo.
    pub state: ScoreState,
}

/// Outcome of [`RangeUndoRedo::redo`].
#[derive(Debug, Clone)]
pub struct RedoOutcome {
    /// The operation, now stamped as redone.
    pub operation: UndoOperation,
    /// The restore versions written.
    pub restored: Vec<EventRecord>,
    /// The score after the redo.
    pub state: ScoreState,
}

/// What an undo of a range would remove, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangePreview {
    /// The match searched.
    pub match_id: String,
    /// The parsed range.
    pub range: KeyRange,
    /// Active, non-tombstoned records in the range.
    pub events: Vec<EventRecord>,
    /// Sum of their runs.
    pub runs_to_remove: u32,
    /// Count of their wickets.
    pub wickets_to_remove: u32,
}

/// One row of the undo history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOperationSummary {
    /// Operation identifier, used to redo.
    pub operation_id: Uuid,
    /// The requested range.
    pub range: KeyRange,
    /// Keys the operation tombstoned.
    pub keys: Vec<DeliveryKey>,
    /// Runs removed.
    pub runs_removed: u32,
    /// Wickets removed.
    pub wickets_removed: u32,
    /// Operator attribution.
    pub undone_by: String,
    /// Operator-supplied reason.
    pub reason: String,
    /// When the undo happened.
    pub timestamp: DateTime<Utc>,
    /// When it was redone, if it was.
    pub redone_at: Option<DateTime<Utc>>,
    /// Who redid it.
    pub redone_by: Option<String>,
    /// Whether a redo is still possible.
    pub can_redo: bool,
}

impl From<&UndoOperation> for UndoOperationSummary {
    fn from(operation: &UndoOperation) -> Self {
        Self {
            operation_id: operation.operation_id,
            range: operation.range,
            keys: operation.events_affected.iter().map(|e| e.key).collect(),
            runs_removed: operation.runs_impact(),
            wickets_removed: operation.wickets_impact(),
            undone_by: operation.undone_by.clone(),
            reason: operation.reason.clone(),
            timestamp: operation.timestamp,
            redone_at: operation.redone_at,
            redone_by: operation.redone_by.clone(),
            can_redo: operation.can_redo(),
        }
    }
}

fn key_strings<'a>(keys: impl IntoIterator<Item = &'a DeliveryKey>) -> Vec<String> {
    keys.into_iter().map(ToString::to_string).collect()
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn recompute_failed(match_id: &str, operation_id: Uuid, cause: &DomainError) -> DomainError {
    error!(match_id, %operation_id, error = %cause, "operation committed but the score could not be recomputed");
    DomainError::RecomputeFailed {
        match_id: match_id.to_owned(),
        operation_id: Some(operation_id),
        cause: cause.to_string(),
    }
}

/// Range undo and redo over the versioned store.
#[derive(Clone)]
pub struct RangeUndoRedo {
    store: Arc<EventStore>,
    operations: Arc<dyn UndoOperationRepository>,
    aggregator: Aggregator,
    clock: Arc<dyn Clock>,
    config: ScoringConfig,
}

impl std::fmt::Debug for RangeUndoRedo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeUndoRedo")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RangeUndoRedo {
    /// Creates the engine.
    #[must_use]
    pub fn new(
        store: Arc<EventStore>,
        operations: Arc<dyn UndoOperationRepository>,
        aggregator: Aggregator,
        clock: Arc<dyn Clock>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            store,
            operations,
            aggregator,
            clock,
            config,
        }
    }

    /// Tombstones every active delivery in the command's range and logs the
    /// operation.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` for malformed or reversed keys.
    /// - `DomainError::EmptyRange` when nothing active falls in the range.
    /// - `DomainError::Storage` when the first write fails (nothing changed).
    /// - `DomainError::PartialUndo` when some keys were tombstoned but the
    ///   sequence or the operation log write did not complete.
    /// - `DomainError::RecomputeFailed` when everything was written but the
    ///   new score could not be computed.
    pub async fn undo_range(&self, command: &UndoRange) -> Result<UndoOutcome, DomainError> {
        let (outcome, _guard) = self.undo_range_and_hold(command).await?;
        Ok(outcome)
    }

    /// Like [`undo_range`](Self::undo_range), but hands back the match's
    /// write lock with the outcome.
    ///
    /// # Errors
    ///
    /// The errors of [`undo_range`](Self::undo_range).
    #[instrument(skip(self, command), fields(match_id = %command.match_id, from = %command.from_key, to = %command.to_key))]
    pub async fn undo_range_and_hold(
        &self,
        command: &UndoRange,
    ) -> Result<(UndoOutcome, MatchGuard), DomainError> {
        let range = parse_range(&command.from_key, &command.to_key)?;
        let match_id = command.match_id.as_str();
        let guard = self.store.lock_match(match_id).await?;

        let selected = select_range(self.store.active_events(match_id).await?, &range);
        if selected.is_empty() {
            return Err(DomainError::EmptyRange {
                match_id: match_id.to_owned(),
                from_key: range.from_key.to_string(),
                to_key: range.to_key.to_string(),
            });
        }

        let mut affected = Vec::with_capacity(selected.len());
        let mut tombstoned = Vec::with_capacity(selected.len());
        let mut failure = None;
        for record in &selected {
            match self
                .store
                .tombstone(&guard, record.key, &command.undone_by)
                .await
            {
                Ok(appended) => {
                    let captured = appended.prior.as_ref().unwrap_or(record);
                    affected.push(AffectedEvent::from(captured));
                    tombstoned.push(appended.record);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        let failure = match failure {
            Some(e) if tombstoned.is_empty() => return Err(e),
            other => other,
        };

        let operation = UndoOperation {
            operation_id: Uuid::new_v4(),
            match_id: match_id.to_owned(),
            range,
            events_affected: affected,
            undone_by: command.undone_by.clone(),
            reason: command.reason.clone(),
            timestamp: self.clock.now(),
            redone_at: None,
            redone_by: None,
        };
        let tombstoned_keys = key_strings(tombstoned.iter().map(|r| &r.key));

        if let Err(e) = self
            .config
            .bounded("insert_undo_operation", self.operations.insert(&operation))
            .await
        {
            error!(match_id, keys = ?tombstoned_keys, error = %e, "undo tombstoned deliveries but the operation log write failed");
            return Err(DomainError::PartialUndo {
                match_id: match_id.to_owned(),
                operation_id: None,
                tombstoned_keys,
                cause: e.to_string(),
            });
        }

        if let Some(e) = failure {
            error!(
                match_id,
                operation_id = %operation.operation_id,
                keys = ?tombstoned_keys,
                error = %e,
                "undo stopped part-way through the range"
            );
            return Err(DomainError::PartialUndo {
                match_id: match_id.to_owned(),
                operation_id: Some(operation.operation_id),
                tombstoned_keys,
                cause: e.to_string(),
            });
        }

        let state = self
            .aggregator
            .compute(match_id)
            .await
            .map_err(|e| recompute_failed(match_id, operation.operation_id, &e))?;

        info!(
            match_id,
            operation_id = %operation.operation_id,
            deliveries = tombstoned.len(),
            runs_removed = operation.runs_impact(),
            "range undone"
        );
        let outcome = UndoOutcome {
            operation,
            tombstoned,
            state,
        };
        Ok((outcome, guard))
    }

    /// Reinstates the deliveries captured by an undo operation.
    ///
    /// The operation is claimed before any record is written, so of two
    /// concurrent redos exactly one proceeds.
    ///
    /// # Errors
    ///
    /// - `DomainError::OperationNotFound` for an unknown identifier, or one
    ///   that belongs to a different match.
    /// - `DomainError::AlreadyRedone` if the operation was redone before.
    /// - `DomainError::PartialRedo` if a restore write fails after the claim.
    /// - `DomainError::Storage` if the operation log cannot be read or
    ///   stamped.
    /// - `DomainError::RecomputeFailed` when every key was restored but the
    ///   new score could not be computed.
    pub async fn redo(&self, command: &RedoUndo) -> Result<RedoOutcome, DomainError> {
        let (outcome, _guard) = self.redo_and_hold(command).await?;
        Ok(outcome)
    }

    /// Like [`redo`](Self::redo), but hands back the match's write lock with
    /// the outcome.
    ///
    /// # Errors
    ///
    /// The errors of [`redo`](Self::redo).
    #[instrument(skip(self, command), fields(match_id = %command.match_id, operation_id = %command.operation_id))]
    pub async fn redo_and_hold(
        &self,
        command: &RedoUndo,
    ) -> Result<(RedoOutcome, MatchGuard), DomainError> {
        let operation = self.load(command.operation_id).await?;
        if operation.match_id != command.match_id {
            return Err(DomainError::OperationNotFound(command.operation_id));
        }
        if let Some(redone_at) = operation.redone_at {
            return Err(DomainError::AlreadyRedone {
                operation_id: operation.operation_id,
                redone_at,
            });
        }

        let guard = self.store.lock_match(&operation.match_id).await?;
        let redone_at = self.clock.now();
        let claimed = self
            .config
            .bounded(
                "update_redone_at",
                self.operations
                    .update_redone_at(operation.operation_id, redone_at, &command.redone_by),
            )
            .await?;
        if !claimed {
            let current = self.load(operation.operation_id).await?;
            return Err(DomainError::AlreadyRedone {
                operation_id: operation.operation_id,
                redone_at: current.redone_at.unwrap_or(redone_at),
            });
        }

        let mut restored = Vec::with_capacity(operation.events_affected.len());
        for (index, captured) in operation.events_affected.iter().enumerate() {
            match self
                .store
                .restore(&guard, captured, &command.redone_by)
                .await
            {
                Ok(appended) => restored.push(appended.record),
                Err(e) => {
                    let restored_keys = key_strings(restored.iter().map(|r| &r.key));
                    let pending_keys =
                        key_strings(operation.events_affected[index..].iter().map(|c| &c.key));
                    error!(
                        operation_id = %operation.operation_id,
                        restored = ?restored_keys,
                        pending = ?pending_keys,
                        error = %e,
                        "redo stopped part-way through the operation"
                    );
                    return Err(DomainError::PartialRedo {
                        operation_id: operation.operation_id,
                        restored_keys,
                        pending_keys,
                        cause: e.to_string(),
                    });
                }
            }
        }

        let state = self
            .aggregator
            .compute(&operation.match_id)
            .await
            .map_err(|e| recompute_failed(&operation.match_id, operation.operation_id, &e))?;

        info!(
            match_id = %operation.match_id,
            operation_id = %operation.operation_id,
            deliveries = restored.len(),
            "undo operation redone"
        );
        let outcome = RedoOutcome {
            operation: UndoOperation {
                redone_at: Some(redone_at),
                redone_by: Some(command.redone_by.clone()),
                ..operation
            },
            restored,
            state,
        };
        Ok((outcome, guard))
    }

    /// Reports what undoing a range would remove. Writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for malformed or reversed keys, or
    /// `DomainError::Storage` if the read fails.
    pub async fn preview(
        &self,
        match_id: &str,
        from_key: &str,
        to_key: &str,
    ) -> Result<RangePreview, DomainError> {
        let range = parse_range(from_key, to_key)?;
        let events = select_range(self.store.active_events(match_id).await?, &range);
        let runs_to_remove = events.iter().map(|r| u32::from(r.runs)).sum();
        let wickets_to_remove = count(events.iter().filter(|r| r.wicket).count());
        Ok(RangePreview {
            match_id: match_id.to_owned(),
            range,
            events,
            runs_to_remove,
            wickets_to_remove,
        })
    }

    /// The most recent undo operations of a match, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails.
    pub async fn history(
        &self,
        match_id: &str,
        limit: usize,
    ) -> Result<Vec<UndoOperationSummary>, DomainError> {
        let operations = self
            .config
            .bounded("find_recent", self.operations.find_recent(match_id, limit))
            .await?;
        Ok(operations.iter().map(UndoOperationSummary::from).collect())
    }

    /// The records the aggregator would fold, in `(over, ball)` order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails.
    pub async fn active_non_tombstoned(
        &self,
        match_id: &str,
    ) -> Result<Vec<EventRecord>, DomainError> {
        let mut active = self.store.active_events(match_id).await?;
        active.retain(|r| !r.is_tombstoned());
        Ok(active)
    }

    async fn load(&self, operation_id: Uuid) -> Result<UndoOperation, DomainError> {
        self.config
            .bounded("find_by_id", self.operations.find_by_id(operation_id))
            .await?
            .ok_or(DomainError::OperationNotFound(operation_id))
    }
}
