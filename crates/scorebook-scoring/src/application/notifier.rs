//! Change notification.
//!
//! After every successful mutation the full recomputed score is handed to a
//! [`Notifier`] as a [`ScoreUpdate`]. Payloads are self-sufficient: a
//! subscriber that misses any number of updates is resynchronised by the
//! next one, so delivery guarantees are left to the transport behind the
//! trait.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use scorebook_core::delivery::{DeliveryKey, EventKind, EventRecord};
use scorebook_core::notifier::Notifier;

use crate::domain::aggregates::ScoreState;

/// What caused a score update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Trigger {
    /// A delivery was recorded or corrected.
    #[serde(rename_all = "camelCase")]
    Delivery {
        /// The delivery key.
        key: DeliveryKey,
        /// Whether the key already existed.
        is_correction: bool,
    },
    /// A range was tombstoned.
    #[serde(rename_all = "camelCase")]
    Undo {
        /// The operation log entry.
        operation_id: Uuid,
        /// Keys tombstoned.
        keys: Vec<DeliveryKey>,
    },
    /// A range was restored.
    #[serde(rename_all = "camelCase")]
    Redo {
        /// The operation that was redone.
        operation_id: Uuid,
        /// Keys restored.
        keys: Vec<DeliveryKey>,
    },
}

/// Compact description of the last record a mutation wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// The delivery key.
    pub key: DeliveryKey,
    /// Runs on the written version.
    pub runs: u8,
    /// Wicket flag on the written version.
    pub wicket: bool,
    /// Kind of the written version.
    pub kind: EventKind,
    /// Version number written.
    pub version: i64,
    /// Attribution.
    pub entered_by: String,
    /// Write time.
    pub timestamp: DateTime<Utc>,
}

impl From<&EventRecord> for EventSummary {
    fn from(record: &EventRecord) -> Self {
        Self {
            key: record.key,
            runs: record.runs,
            wicket: record.wicket,
            kind: record.kind,
            version: record.version,
            entered_by: record.entered_by.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Payload published after every successful mutation. The topic is
/// `match_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    /// Topic: the match whose score changed.
    pub match_id: String,
    /// The full current score.
    pub state: ScoreState,
    /// The mutation that produced it.
    pub trigger: Trigger,
    /// The last record that mutation wrote.
    pub last_event: Option<EventSummary>,
}

/// Builds [`ScoreUpdate`]s and passes them to the injected [`Notifier`].
#[derive(Clone)]
pub struct ChangeNotifier {
    sink: Arc<dyn Notifier<ScoreUpdate>>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier").finish_non_exhaustive()
    }
}

impl ChangeNotifier {
    /// Wraps a transport.
    #[must_use]
    pub fn new(sink: Arc<dyn Notifier<ScoreUpdate>>) -> Self {
        Self { sink }
    }

    /// Publishes the full state of `state.match_id`.
    pub fn publish(&self, state: &ScoreState, trigger: Trigger, last_event: Option<&EventRecord>) {
        let update = ScoreUpdate {
            match_id: state.match_id.clone(),
            state: state.clone(),
            trigger,
            last_event: last_event.map(EventSummary::from),
        };
        debug!(
            match_id = %update.match_id,
            total_runs = update.state.total_runs,
            total_wickets = update.state.total_wickets,
            overs = %update.state.over_display,
            "publishing score update"
        );
        self.sink.publish(&update);
    }
}
