//! Per-match write serialisation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scorebook_core::error::DomainError;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Proof that the caller holds the write lock for one match.
///
/// Version writes take this by reference, so a write can only happen while
/// the lock is held.
#[derive(Debug)]
pub struct MatchGuard {
    match_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl MatchGuard {
    /// The match this guard serialises.
    #[must_use]
    pub fn match_id(&self) -> &str {
        &self.match_id
    }
}

/// One async mutex per match, created on first use.
#[derive(Debug, Default)]
pub struct MatchLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MatchLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive write access to `match_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the lock is not granted within
    /// `timeout`.
    pub async fn acquire(&self, match_id: &str, timeout: Duration) -> Result<MatchGuard, DomainError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| DomainError::Storage("match lock table poisoned".to_owned()))?;
            Arc::clone(locks.entry(match_id.to_owned()).or_default())
        };

        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                DomainError::Storage(format!(
                    "timed out after {}ms waiting for the write lock on match {match_id}",
                    timeout.as_millis()
                ))
            })?;

        Ok(MatchGuard {
            match_id: match_id.to_owned(),
            _guard: guard,
        })
    }
}
