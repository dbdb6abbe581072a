//! `PostgreSQL` implementation of the `DeliveryRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use scorebook_core::delivery::{DeliveryKey, EventKind, EventRecord, Snapshot};
use scorebook_core::error::DomainError;
use scorebook_core::repository::DeliveryRepository;

use crate::storage_error;

const SELECT_COLUMNS: &str = "match_id, delivery_key, over_number, ball_number, runs, wicket, \
     recorded_at, kind, version, previous_snapshot, entered_by";

/// Row shape of the `deliveries` table.
#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    match_id: String,
    delivery_key: String,
    over_number: i32,
    ball_number: i16,
    runs: i16,
    wicket: bool,
    recorded_at: DateTime<Utc>,
    kind: String,
    version: i64,
    previous_snapshot: Option<Json<Snapshot>>,
    entered_by: String,
}

impl TryFrom<DeliveryRow> for EventRecord {
    type Error = DomainError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            DomainError::Storage(format!(
                "corrupt delivery row {}/{} v{}: {what}",
                row.match_id, row.delivery_key, row.version
            ))
        };
        let key: DeliveryKey = row
            .delivery_key
            .parse()
            .map_err(|e| corrupt(&format!("{e}")))?;
        let over = u32::try_from(row.over_number).map_err(|_| corrupt("over_number"))?;
        let ball = u8::try_from(row.ball_number).map_err(|_| corrupt("ball_number"))?;
        let runs = u8::try_from(row.runs).map_err(|_| corrupt("runs"))?;
        let kind: EventKind = row.kind.parse().map_err(|e: String| corrupt(&e))?;
        if key.over() != over || key.ball() != ball {
            return Err(corrupt("delivery_key does not match over/ball"));
        }

        Ok(Self {
            key,
            match_id: row.match_id,
            over,
            ball,
            runs,
            wicket: row.wicket,
            timestamp: row.recorded_at,
            kind,
            version: row.version,
            previous_snapshot: row.previous_snapshot.map(|Json(snapshot)| snapshot),
            entered_by: row.entered_by,
        })
    }
}

fn into_records(rows: Vec<DeliveryRow>) -> Result<Vec<EventRecord>, DomainError> {
    rows.into_iter().map(EventRecord::try_from).collect()
}

/// PostgreSQL-backed delivery repository.
#[derive(Debug, Clone)]
pub struct PgDeliveryRepository {
    pool: PgPool,
}

impl PgDeliveryRepository {
    /// Creates a new `PgDeliveryRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PgDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        let over = i32::try_from(record.over)
            .map_err(|_| DomainError::invalid("over", "must fit in a 32-bit integer"))?;

        let result = sqlx::query(
            "INSERT INTO deliveries (match_id, delivery_key, over_number, ball_number, runs, \
             wicket, recorded_at, kind, version, previous_snapshot, entered_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&record.match_id)
        .bind(record.key.to_string())
        .bind(over)
        .bind(i16::from(record.ball))
        .bind(i16::from(record.runs))
        .bind(record.wicket)
        .bind(record.timestamp)
        .bind(record.kind.as_str())
        .bind(record.version)
        .bind(record.previous_snapshot.map(Json))
        .bind(&record.entered_by)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DomainError::ConcurrencyConflict {
                    match_id: record.match_id.clone(),
                    key: record.key.to_string(),
                    version: record.version,
                })
            }
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        let row = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM deliveries \
             WHERE match_id = $1 AND delivery_key = $2 \
             ORDER BY version DESC LIMIT 1"
        ))
        .bind(match_id)
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(EventRecord::try_from).transpose()
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM ( \
                 SELECT DISTINCT ON (delivery_key) {SELECT_COLUMNS} FROM deliveries \
                 WHERE match_id = $1 \
                 ORDER BY delivery_key, version DESC \
             ) latest \
             ORDER BY over_number, ball_number"
        ))
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_records(rows)
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM deliveries \
             WHERE match_id = $1 \
             ORDER BY over_number, ball_number, version"
        ))
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_records(rows)
    }
}
