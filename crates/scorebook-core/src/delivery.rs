//! Delivery records — the versioned unit of the ledger.
//!
//! Every change to a delivery is a new immutable [`EventRecord`]. Records
//! sharing a `(match_id, key)` form a gap-free version chain starting at 1,
//! and the highest version is the *active* record for that key.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Partition used when an intent does not name a match.
pub const DEFAULT_MATCH_ID: &str = "default";

/// Highest legal ball number within an over.
///
/// Keeping this below 10 is what makes [`DeliveryKey::ordinal`] collision
/// free: `over * 10 + ball` can never carry into the next over.
pub const MAX_BALL: u8 = 6;

/// Highest run value a single delivery may record.
pub const MAX_RUNS: u8 = 6;

const _: () = assert!(MAX_BALL < 10);

/// Errors produced while building or parsing a [`DeliveryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The text is not of the form `<digits>.<digits>`.
    #[error("must match the form over.ball (e.g. 4.2), got {0:?}")]
    Malformed(String),

    /// The over component is zero.
    #[error("over must be at least 1, got {0}")]
    OverOutOfRange(u32),

    /// The ball component is outside `1..=6`.
    #[error("ball must be between 1 and {MAX_BALL}, got {0}")]
    BallOutOfRange(u32),
}

/// Identity of a delivery within a match, rendered as `"{over}.{ball}"`.
///
/// Ordering is `(over, ball)` ascending, which is the order the aggregate
/// folds records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DeliveryKey {
    over: u32,
    ball: u8,
}

impl DeliveryKey {
    /// Builds a key, rejecting a zero over or a ball outside `1..=6`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::OverOutOfRange` or `KeyError::BallOutOfRange`.
    pub fn new(over: u32, ball: u8) -> Result<Self, KeyError> {
        if over == 0 {
            return Err(KeyError::OverOutOfRange(over));
        }
        if !(1..=MAX_BALL).contains(&ball) {
            return Err(KeyError::BallOutOfRange(u32::from(ball)));
        }
        Ok(Self { over, ball })
    }

    /// The over number.
    #[must_use]
    pub fn over(self) -> u32 {
        self.over
    }

    /// The ball number within the over.
    #[must_use]
    pub fn ball(self) -> u8 {
        self.ball
    }

    /// Range-comparison ordinal, `over * 10 + ball`.
    #[must_use]
    pub fn ordinal(self) -> u64 {
        u64::from(self.over) * 10 + u64::from(self.ball)
    }
}

impl fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.over, self.ball)
    }
}

impl FromStr for DeliveryKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || KeyError::Malformed(s.to_owned());
        let (over, ball) = s.split_once('.').ok_or_else(malformed)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(over) || !all_digits(ball) {
            return Err(malformed());
        }
        let over: u32 = over.parse().map_err(|_| malformed())?;
        let ball: u32 = ball.parse().map_err(|_| malformed())?;
        let ball = u8::try_from(ball).map_err(|_| KeyError::BallOutOfRange(ball))?;
        Self::new(over, ball)
    }
}

impl From<DeliveryKey> for String {
    fn from(key: DeliveryKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for DeliveryKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Why a record version exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// First version of a key.
    New,
    /// A later version with replacement `runs`/`wicket`.
    Correction,
    /// Excluded from aggregation by a range undo.
    Tombstoned,
    /// Reinstated by a redo.
    Restored,
}

impl EventKind {
    /// The persisted name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Correction => "correction",
            Self::Tombstoned => "tombstoned",
            Self::Restored => "restored",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "correction" => Ok(Self::Correction),
            "tombstoned" => Ok(Self::Tombstoned),
            "restored" => Ok(Self::Restored),
            other => Err(format!("unknown event kind {other:?}")),
        }
    }
}

/// State of the prior active record, captured on every non-`new` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Runs of the prior active record.
    pub runs: u8,
    /// Wicket flag of the prior active record.
    pub wicket: bool,
    /// Kind of the prior active record (tombstone and restore only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    /// Version of the prior active record (tombstone and restore only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Snapshot {
    /// Captures only the scoring values, as a correction does.
    #[must_use]
    pub fn values_of(record: &EventRecord) -> Self {
        Self {
            runs: record.runs,
            wicket: record.wicket,
            kind: None,
            version: None,
        }
    }

    /// Captures scoring values plus kind and version, as tombstone and
    /// restore do.
    #[must_use]
    pub fn full_of(record: &EventRecord) -> Self {
        Self {
            kind: Some(record.kind),
            version: Some(record.version),
            ..Self::values_of(record)
        }
    }
}

/// One persisted version of one logical delivery.
///
/// The serialized field names are the durable audit contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// `"{over}.{ball}"`, shared by every version of this delivery.
    pub key: DeliveryKey,
    /// Partition the delivery belongs to.
    pub match_id: String,
    /// Over number (>= 1).
    pub over: u32,
    /// Ball number (1..=6).
    pub ball: u8,
    /// Runs scored (0..=6).
    pub runs: u8,
    /// Whether a wicket fell.
    pub wicket: bool,
    /// Creation time of this version. Orders the audit log only.
    pub timestamp: DateTime<Utc>,
    /// Why this version exists.
    pub kind: EventKind,
    /// Position in the key's version chain, starting at 1.
    pub version: i64,
    /// The prior active record's state; absent only for `new`.
    #[serde(default)]
    pub previous_snapshot: Option<Snapshot>,
    /// Free-text attribution.
    pub entered_by: String,
}

impl EventRecord {
    /// Whether this record, when active, hides its key from aggregation.
    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        self.kind == EventKind::Tombstoned
    }
}
