//! Domain error types.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// A single rejected input field and the constraint it broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Name of the offending field, as the caller spelled it.
    pub field: String,
    /// Human-readable constraint that was not met.
    pub constraint: String,
}

impl FieldViolation {
    /// Creates a new violation.
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Intent input failed shape or range checks. Never persisted or published.
    #[error("validation error: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// No active, non-tombstoned delivery falls inside the requested range.
    #[error("no active deliveries in range {from_key}..={to_key} for match {match_id}")]
    EmptyRange {
        /// The match that was searched.
        match_id: String,
        /// Inclusive lower key.
        from_key: String,
        /// Inclusive upper key.
        to_key: String,
    },

    /// An undo operation was not found.
    #[error("undo operation not found: {0}")]
    OperationNotFound(Uuid),

    /// The undo operation has already been redone.
    #[error("undo operation {operation_id} was already redone at {redone_at}")]
    AlreadyRedone {
        /// The operation that was already redone.
        operation_id: Uuid,
        /// When the first redo happened.
        redone_at: DateTime<Utc>,
    },

    /// Another writer claimed the target version first.
    #[error("concurrency conflict on {match_id}/{key}: version {version} already exists")]
    ConcurrencyConflict {
        /// The match being written.
        match_id: String,
        /// The delivery key being written.
        key: String,
        /// The version that was already taken.
        version: i64,
    },

    /// A persistence primitive failed or timed out. Callers may retry.
    #[error("storage error: {0}")]
    Storage(String),

    /// A bulk undo tombstoned some records but could not fully record itself.
    #[error(
        "partial undo on match {match_id}: tombstoned [{}] but {cause}",
        .tombstoned_keys.join(", ")
    )]
    PartialUndo {
        /// The match being undone.
        match_id: String,
        /// The operation log entry, if one could be written for the subset.
        operation_id: Option<Uuid>,
        /// Keys that now carry a tombstone version.
        tombstoned_keys: Vec<String>,
        /// What failed.
        cause: String,
    },

    /// A redo was claimed but not every key could be restored.
    #[error(
        "partial redo of {operation_id}: restored [{}], pending [{}]: {cause}",
        .restored_keys.join(", "),
        .pending_keys.join(", ")
    )]
    PartialRedo {
        /// The operation being redone.
        operation_id: Uuid,
        /// Keys that received a restore version.
        restored_keys: Vec<String>,
        /// Keys still tombstoned.
        pending_keys: Vec<String>,
        /// What failed.
        cause: String,
    },

    /// The write committed but the score could not be recomputed afterwards,
    /// so nothing was published.
    #[error("match {match_id} was updated but its score could not be recomputed: {cause}")]
    RecomputeFailed {
        /// The match that was written.
        match_id: String,
        /// The undo operation the write belongs to, for undo and redo.
        operation_id: Option<Uuid>,
        /// What failed.
        cause: String,
    },
}

impl DomainError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, constraint)])
    }
}
