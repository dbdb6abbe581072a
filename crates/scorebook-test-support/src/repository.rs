//! Test repositories — storage doubles that fail on cue.
//!
//! The delivery doubles wrap an in-memory repository so reads and the
//! writes they let through behave exactly like the real thing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scorebook_core::delivery::{DeliveryKey, EventRecord};
use scorebook_core::error::DomainError;
use scorebook_core::repository::{DeliveryRepository, UndoOperationRepository};
use scorebook_core::undo::UndoOperation;
use scorebook_event_store::memory::InMemoryDeliveryRepository;
use uuid::Uuid;

fn connection_refused() -> DomainError {
    DomainError::Storage("connection refused".into())
}

/// A delivery repository that reports the first `conflicts` inserts as
/// version conflicts, as if another process had won the race, then behaves
/// normally.
#[derive(Debug)]
pub struct ConflictingDeliveryRepository {
    inner: InMemoryDeliveryRepository,
    conflicts: usize,
    attempts: AtomicUsize,
}

impl ConflictingDeliveryRepository {
    /// Creates a repository that rejects the first `conflicts` inserts.
    #[must_use]
    pub fn new(conflicts: usize) -> Self {
        Self {
            inner: InMemoryDeliveryRepository::new(),
            conflicts,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `insert` calls seen so far, rejected or not.
    pub fn insert_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryRepository for ConflictingDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.conflicts {
            return Err(DomainError::ConcurrencyConflict {
                match_id: record.match_id.clone(),
                key: record.key.to_string(),
                version: record.version,
            });
        }
        self.inner.insert(record).await
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        self.inner.find_latest_version(match_id, key).await
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_active_per_key(match_id).await
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_all(match_id).await
    }
}

/// A delivery repository that accepts `successes` inserts and fails every
/// insert after that. Reads always succeed. Useful for interrupting a bulk
/// undo or redo part-way through.
#[derive(Debug)]
pub struct FlakyDeliveryRepository {
    inner: InMemoryDeliveryRepository,
    successes: usize,
    inserts: AtomicUsize,
}

impl FlakyDeliveryRepository {
    /// Creates a repository that starts failing after `successes` inserts.
    #[must_use]
    pub fn failing_after(successes: usize) -> Self {
        Self {
            inner: InMemoryDeliveryRepository::new(),
            successes,
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DeliveryRepository for FlakyDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) >= self.successes {
            return Err(connection_refused());
        }
        self.inner.insert(record).await
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        self.inner.find_latest_version(match_id, key).await
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_active_per_key(match_id).await
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_all(match_id).await
    }
}

/// A delivery repository whose first `find_active_per_key` takes its
/// snapshot and then stalls for `delay` before returning it, so a write can
/// land while the stale snapshot is in flight. Later reads are immediate.
#[derive(Debug)]
pub struct SlowReadDeliveryRepository {
    inner: InMemoryDeliveryRepository,
    delay: Duration,
    stalled: AtomicBool,
}

impl SlowReadDeliveryRepository {
    /// Creates a repository that stalls its first active read by `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryDeliveryRepository::new(),
            delay,
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DeliveryRepository for SlowReadDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        self.inner.insert(record).await
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        self.inner.find_latest_version(match_id, key).await
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let snapshot = self.inner.find_active_per_key(match_id).await?;
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(snapshot)
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_all(match_id).await
    }
}

/// A delivery repository that serves `successes` calls to
/// `find_active_per_key` and fails every one after that. Writes always
/// succeed, so a mutation can commit and then fail to recompute.
#[derive(Debug)]
pub struct FailingReadsDeliveryRepository {
    inner: InMemoryDeliveryRepository,
    successes: usize,
    reads: AtomicUsize,
}

impl FailingReadsDeliveryRepository {
    /// Creates a repository that fails active reads after `successes`.
    #[must_use]
    pub fn failing_active_reads_after(successes: usize) -> Self {
        Self {
            inner: InMemoryDeliveryRepository::new(),
            successes,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DeliveryRepository for FailingReadsDeliveryRepository {
    async fn insert(&self, record: &EventRecord) -> Result<(), DomainError> {
        self.inner.insert(record).await
    }

    async fn find_latest_version(
        &self,
        match_id: &str,
        key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        self.inner.find_latest_version(match_id, key).await
    }

    async fn find_active_per_key(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) >= self.successes {
            return Err(connection_refused());
        }
        self.inner.find_active_per_key(match_id).await
    }

    async fn find_all(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.inner.find_all(match_id).await
    }
}

/// A delivery repository that always returns a storage error.
#[derive(Debug)]
pub struct FailingDeliveryRepository;

#[async_trait]
impl DeliveryRepository for FailingDeliveryRepository {
    async fn insert(&self, _record: &EventRecord) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn find_latest_version(
        &self,
        _match_id: &str,
        _key: DeliveryKey,
    ) -> Result<Option<EventRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn find_active_per_key(&self, _match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn find_all(&self, _match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        Err(connection_refused())
    }
}

/// An undo operation repository that always returns a storage error.
#[derive(Debug)]
pub struct FailingUndoOperationRepository;

#[async_trait]
impl UndoOperationRepository for FailingUndoOperationRepository {
    async fn insert(&self, _operation: &UndoOperation) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn find_by_id(&self, _operation_id: Uuid) -> Result<Option<UndoOperation>, DomainError> {
        Err(connection_refused())
    }

    async fn update_redone_at(
        &self,
        _operation_id: Uuid,
        _redone_at: DateTime<Utc>,
        _redone_by: &str,
    ) -> Result<bool, DomainError> {
        Err(connection_refused())
    }

    async fn find_recent(
        &self,
        _match_id: &str,
        _limit: usize,
    ) -> Result<Vec<UndoOperation>, DomainError> {
        Err(connection_refused())
    }
}
