//! Versioned delivery persistence.
//!
//! The `EventStore` is the only component that assigns versions. Every write
//! reads the active record for its key, builds the next version from it, and
//! appends; nothing is ever updated in place.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use scorebook_core::clock::Clock;
use scorebook_core::delivery::{DeliveryKey, EventKind, EventRecord, Snapshot};
use scorebook_core::error::DomainError;
use scorebook_core::repository::DeliveryRepository;
use scorebook_core::undo::AffectedEvent;

use crate::application::locks::{MatchGuard, MatchLocks};
use crate::config::ScoringConfig;
use crate::domain::intent::DeliveryIntent;

/// Outcome of [`EventStore::apply`].
#[derive(Debug, Clone)]
pub struct AppliedDelivery {
    /// The version that was written.
    pub record: EventRecord,
    /// Whether the key already existed.
    pub is_correction: bool,
}

/// A freshly written version together with the record it superseded.
#[derive(Debug, Clone)]
pub struct Appended {
    /// The version that was written.
    pub record: EventRecord,
    /// The previous active record, if the key existed.
    pub prior: Option<EventRecord>,
}

/// The parts of a new version that depend on the prior active record.
struct Draft {
    kind: EventKind,
    runs: u8,
    wicket: bool,
    previous_snapshot: Option<Snapshot>,
}

/// Append-only, versioned delivery store.
pub struct EventStore {
    deliveries: Arc<dyn DeliveryRepository>,
    clock: Arc<dyn Clock>,
    locks: MatchLocks,
    config: ScoringConfig,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventStore {
    /// Creates a store over the given repository.
    #[must_use]
    pub fn new(
        deliveries: Arc<dyn DeliveryRepository>,
        clock: Arc<dyn Clock>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            deliveries,
            clock,
            locks: MatchLocks::new(),
            config,
        }
    }

    /// Takes the write lock for a match.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the lock cannot be taken in time.
    pub async fn lock_match(&self, match_id: &str) -> Result<MatchGuard, DomainError> {
        self.locks.acquire(match_id, self.config.lock_timeout).await
    }

    /// Validates an intent and appends it as version 1 (`new`) or as the
    /// next version of an existing key (`correction`).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for out-of-range input (nothing is
    /// written), or `DomainError::Storage` if persistence fails.
    pub async fn apply(&self, intent: &DeliveryIntent) -> Result<AppliedDelivery, DomainError> {
        let (applied, _guard) = self.apply_and_hold(intent).await?;
        Ok(applied)
    }

    /// Like [`apply`](Self::apply), but hands back the match's write lock
    /// with the outcome. Whatever the caller reads or publishes before
    /// dropping the guard cannot interleave with another write to the match.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for out-of-range input (nothing is
    /// written), or `DomainError::Storage` if persistence fails.
    #[instrument(skip(self, intent), fields(over = intent.over, ball = intent.ball))]
    pub async fn apply_and_hold(
        &self,
        intent: &DeliveryIntent,
    ) -> Result<(AppliedDelivery, MatchGuard), DomainError> {
        let delivery = intent.validate()?;
        let guard = self.lock_match(&delivery.match_id).await?;

        let appended = self
            .append_version(&guard, delivery.key, &delivery.entered_by, |prior| {
                Ok(match prior {
                    None => Draft {
                        kind: EventKind::New,
                        runs: delivery.runs,
                        wicket: delivery.wicket,
                        previous_snapshot: None,
                    },
                    Some(active) => Draft {
                        kind: EventKind::Correction,
                        runs: delivery.runs,
                        wicket: delivery.wicket,
                        previous_snapshot: Some(Snapshot::values_of(active)),
                    },
                })
            })
            .await?;

        let applied = AppliedDelivery {
            is_correction: appended.prior.is_some(),
            record: appended.record,
        };
        Ok((applied, guard))
    }

    /// Appends a `tombstoned` version of `key`, keeping its runs and wicket
    /// for the audit trail.
    pub(crate) async fn tombstone(
        &self,
        guard: &MatchGuard,
        key: DeliveryKey,
        tombstoned_by: &str,
    ) -> Result<Appended, DomainError> {
        self.append_version(guard, key, tombstoned_by, |prior| match prior {
            Some(active) if !active.is_tombstoned() => Ok(Draft {
                kind: EventKind::Tombstoned,
                runs: active.runs,
                wicket: active.wicket,
                previous_snapshot: Some(Snapshot::full_of(active)),
            }),
            Some(_) => Err(DomainError::Storage(format!(
                "{key} was tombstoned by another writer"
            ))),
            None => Err(DomainError::Storage(format!(
                "{key} has no record to tombstone"
            ))),
        })
        .await
    }

    /// Appends a `restored` version of a key carrying the values captured
    /// when it was undone.
    pub(crate) async fn restore(
        &self,
        guard: &MatchGuard,
        captured: &AffectedEvent,
        restored_by: &str,
    ) -> Result<Appended, DomainError> {
        self.append_version(guard, captured.key, restored_by, |prior| match prior {
            Some(active) => Ok(Draft {
                kind: EventKind::Restored,
                runs: captured.runs,
                wicket: captured.wicket,
                previous_snapshot: Some(Snapshot::full_of(active)),
            }),
            None => Err(DomainError::Storage(format!(
                "{} has no record to restore",
                captured.key
            ))),
        })
        .await
    }

    /// Read-modify-write of one version, retried when another writer takes
    /// the target version first.
    async fn append_version<F>(
        &self,
        guard: &MatchGuard,
        key: DeliveryKey,
        entered_by: &str,
        build: F,
    ) -> Result<Appended, DomainError>
    where
        F: Fn(Option<&EventRecord>) -> Result<Draft, DomainError>,
    {
        let match_id = guard.match_id();
        let max_attempts = self.config.max_write_attempts.max(1);
        let mut attempt = 1;

        loop {
            let prior = self
                .config
                .bounded(
                    "find_latest_version",
                    self.deliveries.find_latest_version(match_id, key),
                )
                .await?;
            let draft = build(prior.as_ref())?;
            let record = EventRecord {
                key,
                match_id: match_id.to_owned(),
                over: key.over(),
                ball: key.ball(),
                runs: draft.runs,
                wicket: draft.wicket,
                timestamp: self.clock.now(),
                kind: draft.kind,
                version: prior.as_ref().map_or(1, |active| active.version + 1),
                previous_snapshot: draft.previous_snapshot,
                entered_by: entered_by.to_owned(),
            };

            match self
                .config
                .bounded("insert", self.deliveries.insert(&record))
                .await
            {
                Ok(()) => {
                    info!(
                        match_id,
                        key = %record.key,
                        version = record.version,
                        kind = %record.kind,
                        "delivery version recorded"
                    );
                    return Ok(Appended { record, prior });
                }
                Err(DomainError::ConcurrencyConflict { version, .. }) if attempt < max_attempts => {
                    warn!(match_id, %key, version, attempt, "version taken by another writer, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The active (highest-version) record of every key, of any kind,
    /// ordered by `(over, ball)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails or times out.
    pub async fn active_events(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.config
            .bounded(
                "find_active_per_key",
                self.deliveries.find_active_per_key(match_id),
            )
            .await
    }

    /// Every version of every key, ordered by `(over, ball, version)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails or times out.
    pub async fn all_versions(&self, match_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        self.config
            .bounded("find_all", self.deliveries.find_all(match_id))
            .await
    }

    /// Active records, most recently written first, capped at `limit`.
    /// For human-facing logs only; aggregation never uses this order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails or times out.
    pub async fn recent_by_timestamp(
        &self,
        match_id: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, DomainError> {
        let mut active = self.active_events(match_id).await?;
        active.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.key.cmp(&a.key))
        });
        active.truncate(limit);
        Ok(active)
    }
}
