//! Tunables for the scoring services.

use std::future::Future;
use std::time::Duration;

use scorebook_core::error::DomainError;

/// Runtime limits applied by every scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Upper bound on any single persistence call.
    pub store_timeout: Duration,
    /// Upper bound on waiting for a match's write lock.
    pub lock_timeout: Duration,
    /// How many times a version write is attempted when another writer
    /// takes the target version first.
    pub max_write_attempts: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(10),
            max_write_attempts: 3,
        }
    }
}

impl ScoringConfig {
    /// Runs a persistence call, converting expiry into `DomainError::Storage`.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `DomainError::Storage` on timeout.
    pub async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                DomainError::Storage(format!(
                    "{operation} timed out after {}ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }
}
