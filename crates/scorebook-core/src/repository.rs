//! Storage contracts for delivery records and undo operations.
//!
//! Implementations live in `scorebook-event-store`; the scoring context only
//! ever sees these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::delivery::{DeliveryKey, EventRecord};
use crate::error::DomainError;
use crate::undo::UndoOperation;

/// Append-only store of delivery record versions.
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Appends one record version.
    ///
    /// Returns `DomainError::ConcurrencyConflict` if a record with the same
    /// `(match_id, key, version)` already exists.
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError>;

    /// Loads the highest version for `(match_id, key)`, if any.
    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError>;

    /// Loads the highest version of every key, ordered by `(over, ball)`.
    /// Records of every kind are returned.
    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError>;

    /// Loads every version, ordered by `(over, ball, version)`.
    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError>;
}

/// Store of undo operations.
#[async_trait]
pub trait UndoOperationRepository: Send + Sync {
    /// Persists a new operation.
    async fn insert(&self, operation: &UndoOperation) -> Result<(), DomainError>;

    /// Loads an operation by identifier.
    async fn find_by_id(&self, operation_id: Uuid) -> Result<Option<UndoOperation>, DomainError>;

    /// Stamps `redone_at`/`redone_by` only if the operation has not been
    /// redone yet. Returns `true` if this call made the transition.
    async fn update_redone_at(
        &self,
        operation_id: Uuid,
        redone_at: DateTime<Utc>,
        redone_by: &str,
    ) -> Result<bool, DomainError>;

    /// Loads up to `limit` operations for a match, newest first.
    async fn find_recent(
        &self,
        match_id: &str,
        limit: usize,
    ) -> Result<Vec<UndoOperation>, DomainError>;
}
