//! In-memory implementations of the storage traits.
//!
//! Used for local development, single-process deployments, and tests.
//! Reads take a shared lock and return a consistent snapshot of the match.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use scorebook_core::delivery::{DeliveryKey, EventRecord};
use scorebook_core::error::DomainError;
use scorebook_core::repository::{DeliveryRepository, UndoOperationRepository};
use scorebook_core::undo::UndoOperation;

fn poisoned(store: &str) -> DomainError {
    DomainError::Storage(format!("{store} lock poisoned"))
}

/// In-memory delivery record store, partitioned by match.
#[derive(Debug, Default)]
pub struct InMemoryDeliveryRepository {
    matches: RwLock<HashMap<String, Vec<EventRecord>>>,
}

impl InMemoryDeliveryRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<EventRecord>>>, DomainError> {
        self.matches.read().map_err(|_| poisoned("delivery store"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<EventRecord>>>, DomainError> {
        self.matches.write().map_err(|_| poisoned("delivery store"))
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        let mut matches = self.write()?;
        let records = matches.entry(record.match_id.clone()).or_default();
        if records
            .iter()
            .any(|r| r.key == record.key && r.version == record.version)
        {
            return Err(DomainError::ConcurrencyConflict {
                match_id: record.match_id.clone(),
                key: record.key.to_string(),
                version: record.version,
            });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        let matches = self.read()?;
        Ok(matches.get(match_id).and_then(|records| {
            records
                .iter()
                .filter(|r| r.key == key)
                .max_by_key(|r| r.version)
                .cloned()
        }))
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let matches = self.read()?;
        let Some(records) = matches.get(match_id) else {
            return Ok(Vec::new());
        };
        let mut latest: BTreeMap<DeliveryKey, &EventRecord> = BTreeMap::new();
        for record in records {
            match latest.get(&record.key) {
                Some(current) if current.version >= record.version => {}
                _ => {
                    latest.insert(record.key, record);
                }
            }
        }
        Ok(latest.into_values().cloned().collect())
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let matches = self.read()?;
        let mut records = matches.get(match_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| (r.key, r.version));
        Ok(records)
    }
}

/// In-memory undo operation store.
#[derive(Debug, Default)]
pub struct InMemoryUndoOperationRepository {
    operations: RwLock<Vec<UndoOperation>>,
}

impl InMemoryUndoOperationRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UndoOperationRepository for InMemoryUndoOperationRepository {
    async fn insert(&self, operation: &UndoOperation) -> Result<(), DomainError> {
        let mut operations = self
            .operations
            .write()
            .map_err(|_| poisoned("undo operation store"))?;
        if operations
            .iter()
            .any(|op| op.operation_id == operation.operation_id)
        {
            return Err(DomainError::Storage(format!(
                "undo operation {} already exists",
                operation.operation_id
            )));
        }
        operations.push(operation.clone());
        Ok(())
    }

    async fn find_by_id(&self, operation_id: Uuid) -> Result<Option<UndoOperation>, DomainError> {
        let operations = self
            .operations
            .read()
            .map_err(|_| poisoned("undo operation store"))?;
        Ok(operations
            .iter()
            .find(|op| op.operation_id == operation_id)
            .cloned())
    }

    async fn update_redone_at(
        &self,
        operation_id: Uuid,
        redone_at: DateTime<Utc>,
        redone_by: &str,
    ) -> Result<bool, DomainError> {
        let mut operations = self
            .operations
            .write()
            .map_err(|_| poisoned("undo operation store"))?;
        match operations
            .iter_mut()
            .find(|op| op.operation_id == operation_id)
        {
            Some(op) if op.redone_at.is_none() => {
                op.redone_at = Some(redone_at);
                op.redone_by = Some(redone_by.to_owned());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_recent(
        &self,
        match_id: &str,
        limit: usize,
    ) -> Result<Vec<UndoOperation>, DomainError> {
        let operations = self
            .operations
            .read()
            .map_err(|_| poisoned("undo operation store"))?;
        // Newest insert first so equal timestamps keep a stable order.
        let mut recent: Vec<UndoOperation> = operations
            .iter()
            .rev()
            .filter(|op| op.match_id == match_id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use scorebook_core::delivery::EventKind;
    use scorebook_core::undo::KeyRange;

    use super::*;

    fn record(match_id: &str, key: &str, version: i64, runs: u8) -> EventRecord {
        let key: DeliveryKey = key.parse().unwrap();
        EventRecord {
            key,
            match_id: match_id.to_owned(),
            over: key.over(),
            ball: key.ball(),
            runs,
            wicket: false,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            kind: if version == 1 {
                EventKind::New
            } else {
                EventKind::Correction
            },
            version,
            previous_snapshot: None,
            entered_by: "scorer".to_owned(),
        }
    }

    fn operation(match_id: &str, minute: u32) -> UndoOperation {
        UndoOperation {
            operation_id: Uuid::new_v4(),
            match_id: match_id.to_owned(),
            range: KeyRange {
                from_key: "1.1".parse().unwrap(),
                to_key: "1.2".parse().unwrap(),
            },
            events_affected: Vec::new(),
            undone_by: "umpire".to_owned(),
            reason: "test".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, minute, 0).unwrap(),
            redone_at: None,
            redone_by: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_version() {
        // Arrange
        let repo = InMemoryDeliveryRepository::new();
        repo.insert(&record("m1", "1.1", 1, 0)).await.unwrap();

        // Act
        let result = repo.insert(&record("m1", "1.1", 1, 4)).await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict { key, version, .. }) => {
                assert_eq!(key, "1.1");
                assert_eq!(version, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_active_per_key_takes_max_version_in_over_ball_order() {
        // Arrange
        let repo = InMemoryDeliveryRepository::new();
        repo.insert(&record("m1", "2.1", 1, 1)).await.unwrap();
        repo.insert(&record("m1", "1.6", 1, 2)).await.unwrap();
        repo.insert(&record("m1", "1.6", 2, 3)).await.unwrap();
        repo.insert(&record("m2", "1.1", 1, 6)).await.unwrap();

        // Act
        let active = repo.find_active_per_key("m1").await.unwrap();

        // Assert
        let summary: Vec<(String, i64, u8)> = active
            .iter()
            .map(|r| (r.key.to_string(), r.version, r.runs))
            .collect();
        assert_eq!(
            summary,
            vec![("1.6".to_owned(), 2, 3), ("2.1".to_owned(), 1, 1)]
        );
    }

    #[tokio::test]
    async fn test_find_all_orders_by_key_then_version() {
        // Arrange
        let repo = InMemoryDeliveryRepository::new();
        repo.insert(&record("m1", "1.2", 1, 0)).await.unwrap();
        repo.insert(&record("m1", "1.1", 1, 0)).await.unwrap();
        repo.insert(&record("m1", "1.2", 2, 0)).await.unwrap();

        // Act
        let all = repo.find_all("m1").await.unwrap();

        // Assert
        let order: Vec<(String, i64)> = all
            .iter()
            .map(|r| (r.key.to_string(), r.version))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1.1".to_owned(), 1),
                ("1.2".to_owned(), 1),
                ("1.2".to_owned(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_latest_version_is_none_for_unknown_match() {
        let repo = InMemoryDeliveryRepository::new();

        let latest = repo
            .find_latest_version("nope", "1.1".parse().unwrap())
            .await
            .unwrap();

        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_update_redone_at_transitions_once() {
        // Arrange
        let repo = InMemoryUndoOperationRepository::new();
        let op = operation("m1", 0);
        repo.insert(&op).await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();

        // Act
        let first = repo
            .update_redone_at(op.operation_id, now, "umpire")
            .await
            .unwrap();
        let second = repo
            .update_redone_at(op.operation_id, now, "someone-else")
            .await
            .unwrap();

        // Assert
        assert!(first);
        assert!(!second);
        let stored = repo.find_by_id(op.operation_id).await.unwrap().unwrap();
        assert_eq!(stored.redone_at, Some(now));
        assert_eq!(stored.redone_by.as_deref(), Some("umpire"));
    }

    #[tokio::test]
    async fn test_find_recent_is_newest_first_and_capped() {
        // Arrange
        let repo = InMemoryUndoOperationRepository::new();
        let older = operation("m1", 1);
        let newest = operation("m1", 3);
        let middle = operation("m1", 2);
        let other_match = operation("m2", 4);
        for op in [&older, &newest, &middle, &other_match] {
            repo.insert(op).await.unwrap();
        }

        // Act
        let recent = repo.find_recent("m1", 2).await.unwrap();

        // Assert
        let ids: Vec<Uuid> = recent.iter().map(|op| op.operation_id).collect();
        assert_eq!(ids, vec![newest.operation_id, middle.operation_id]);
    }
}
