//! Scorebook event store — concrete persistence for the delivery ledger.
//!
//! Provides in-memory and `PostgreSQL` implementations of the repository
//! traits defined in `scorebook-core`, and [`storage::Storage`] for choosing
//! between them at startup.

pub mod memory;
pub mod pg_delivery_repository;
pub mod pg_undo_operation_repository;
pub mod storage;

use scorebook_core::error::DomainError;

/// Maps a driver error onto the retryable storage variant.
pub(crate) fn storage_error(err: sqlx::Error) -> DomainError {
    tracing::debug!(error = %err, "database call failed");
    DomainError::Storage(err.to_string())
}
