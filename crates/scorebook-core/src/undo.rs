//! Undo operation log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::{DeliveryKey, EventRecord};

/// Inclusive range of delivery keys, compared by [`DeliveryKey::ordinal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub from_key: DeliveryKey,
    /// Inclusive upper bound.
    pub to_key: DeliveryKey,
}

impl KeyRange {
    /// Whether `key` falls inside this range.
    #[must_use]
    pub fn contains(&self, key: DeliveryKey) -> bool {
        (self.from_key.ordinal()..=self.to_key.ordinal()).contains(&key.ordinal())
    }
}

/// Pre-tombstone state of one delivery, captured when its range was undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedEvent {
    /// The delivery key.
    pub key: DeliveryKey,
    /// Over number.
    pub over: u32,
    /// Ball number.
    pub ball: u8,
    /// Runs before the tombstone.
    pub runs: u8,
    /// Wicket flag before the tombstone.
    pub wicket: bool,
    /// Active version that was tombstoned.
    pub version: i64,
    /// Timestamp of that active version.
    pub original_timestamp: DateTime<Utc>,
}

impl From<&EventRecord> for AffectedEvent {
    fn from(record: &EventRecord) -> Self {
        Self {
            key: record.key,
            over: record.over,
            ball: record.ball,
            runs: record.runs,
            wicket: record.wicket,
            version: record.version,
            original_timestamp: record.timestamp,
        }
    }
}

/// Persisted record of one bulk retraction.
///
/// Written once when the range is tombstoned and stamped once on redo; never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOperation {
    /// Globally unique identifier.
    pub operation_id: Uuid,
    /// The match the range belongs to.
    pub match_id: String,
    /// The range the operator asked for.
    pub range: KeyRange,
    /// Exact key set tombstoned, with the values redo will restore.
    pub events_affected: Vec<AffectedEvent>,
    /// Operator attribution.
    pub undone_by: String,
    /// Operator-supplied reason.
    pub reason: String,
    /// When the undo happened.
    pub timestamp: DateTime<Utc>,
    /// Set exactly once, by the redo that reinstated this range.
    #[serde(default)]
    pub redone_at: Option<DateTime<Utc>>,
    /// Who performed the redo.
    #[serde(default)]
    pub redone_by: Option<String>,
}

impl UndoOperation {
    /// Whether this operation may still be redone.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redone_at.is_none()
    }

    /// Sum of runs removed by this operation.
    #[must_use]
    pub fn runs_impact(&self) -> u32 {
        self.events_affected.iter().map(|e| u32::from(e.runs)).sum()
    }

    /// Number of wickets removed by this operation.
    #[must_use]
    pub fn wickets_impact(&self) -> u32 {
        let wickets = self.events_affected.iter().filter(|e| e.wicket).count();
        u32::try_from(wickets).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> DeliveryKey {
        text.parse().unwrap()
    }

    #[test]
    fn test_range_is_inclusive_and_crosses_overs() {
        let range = KeyRange {
            from_key: key("1.5"),
            to_key: key("2.2"),
        };

        assert!(!range.contains(key("1.4")));
        assert!(range.contains(key("1.5")));
        assert!(range.contains(key("1.6")));
        assert!(range.contains(key("2.1")));
        assert!(range.contains(key("2.2")));
        assert!(!range.contains(key("2.3")));
    }
}
