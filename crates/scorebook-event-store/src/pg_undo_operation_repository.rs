//! `PostgreSQL` implementation of the `UndoOperationRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use scorebook_core::delivery::KeyError;
use scorebook_core::error::DomainError;
use scorebook_core::repository::UndoOperationRepository;
use scorebook_core::undo::{AffectedEvent, KeyRange, UndoOperation};

use crate::storage_error;

const SELECT_COLUMNS: &str = "operation_id, match_id, from_key, to_key, events_affected, \
     undone_by, reason, created_at, redone_at, redone_by";

#[derive(Debug, sqlx::FromRow)]
struct UndoOperationRow {
    operation_id: Uuid,
    match_id: String,
    from_key: String,
    to_key: String,
    events_affected: Json<Vec<AffectedEvent>>,
    undone_by: String,
    reason: String,
    created_at: DateTime<Utc>,
    redone_at: Option<DateTime<Utc>>,
    redone_by: Option<String>,
}

impl TryFrom<UndoOperationRow> for UndoOperation {
    type Error = DomainError;

    fn try_from(row: UndoOperationRow) -> Result<Self, Self::Error> {
        let corrupt = |e: KeyError| {
            DomainError::Storage(format!(
                "corrupt undo operation {}: {e}",
                row.operation_id
            ))
        };
        let range = KeyRange {
            from_key: row.from_key.parse().map_err(corrupt)?,
            to_key: row.to_key.parse().map_err(corrupt)?,
        };

        Ok(Self {
            operation_id: row.operation_id,
            match_id: row.match_id,
            range,
            events_affected: row.events_affected.0,
            undone_by: row.undone_by,
            reason: row.reason,
            timestamp: row.created_at,
            redone_at: row.redone_at,
            redone_by: row.redone_by,
        })
    }
}

/// PostgreSQL-backed undo operation repository.
#[derive(Debug, Clone)]
pub struct PgUndoOperationRepository {
    pool: PgPool,
}

impl PgUndoOperationRepository {
    /// Creates a new `PgUndoOperationRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UndoOperationRepository for PgUndoOperationRepository {
    async fn insert(&self, operation: &UndoOperation) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO undo_operations (operation_id, match_id, from_key, to_key, \
             events_affected, undone_by, reason, created_at, redone_at, redone_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(operation.operation_id)
        .bind(&operation.match_id)
        .bind(operation.range.from_key.to_string())
        .bind(operation.range.to_key.to_string())
        .bind(Json(&operation.events_affected))
        .bind(&operation.undone_by)
        .bind(&operation.reason)
        .bind(operation.timestamp)
        .bind(operation.redone_at)
        .bind(operation.redone_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_by_id(&self, operation_id: Uuid) -> Result<Option<UndoOperation>, DomainError> {
        let row = sqlx::query_as::<_, UndoOperationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM undo_operations WHERE operation_id = $1"
        ))
        .bind(operation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(UndoOperation::try_from).transpose()
    }

    async fn update_redone_at(
        &self,
        operation_id: Uuid,
        redone_at: DateTime<Utc>,
        redone_by: &str,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE undo_operations SET redone_at = $2, redone_by = $3 \
             WHERE operation_id = $1 AND redone_at IS NULL",
        )
        .bind(operation_id)
        .bind(redone_at)
        .bind(redone_by)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_recent(
        &self,
        match_id: &str,
        limit: usize,
    ) -> Result<Vec<UndoOperation>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, UndoOperationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM undo_operations \
             WHERE match_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        ))
        .bind(match_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(UndoOperation::try_from).collect()
    }
}
