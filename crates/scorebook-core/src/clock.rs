//! Clock abstraction.
//!
//! Record timestamps are audit data only; injecting the clock keeps
//! replays and tests deterministic.

use chrono::{DateTime, Utc};

/// Source of wall-clock time for new record versions and computed states.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
