//! Topic-scoped fan-out of score updates.
//!
//! Each match gets its own broadcast channel, created when the first
//! subscriber joins. Dropping a receiver leaves the topic; a channel with no
//! receivers left is removed on the next publish to it or the next
//! subscribe to any match, whichever comes first.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use scorebook_core::notifier::Notifier;
use scorebook_scoring::application::notifier::ScoreUpdate;
use tokio::sync::broadcast;
use tracing::debug;

type Channels = HashMap<String, broadcast::Sender<ScoreUpdate>>;

/// Per-match broadcast channels behind the [`Notifier`] trait.
#[derive(Debug)]
pub struct MatchBroadcaster {
    capacity: usize,
    channels: Mutex<Channels>,
}

impl MatchBroadcaster {
    /// Creates a broadcaster buffering `capacity` updates per match.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the map cannot leave it inconsistent.
    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the topic of `match_id`, first dropping every topic whose
    /// subscribers have all left.
    pub fn subscribe(&self, match_id: &str) -> broadcast::Receiver<ScoreUpdate> {
        let mut channels = self.channels();
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        if channels.len() < before {
            debug!(swept = before - channels.len(), "abandoned topics removed");
        }
        channels
            .entry(match_id.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers of `match_id`.
    pub fn subscriber_count(&self, match_id: &str) -> usize {
        self.channels()
            .get(match_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drops every channel so open streams end. Used at shutdown.
    pub fn close_all(&self) {
        let mut channels = self.channels();
        debug!(topics = channels.len(), "closing live score channels");
        channels.clear();
    }
}

impl Notifier<ScoreUpdate> for MatchBroadcaster {
    fn publish(&self, update: &ScoreUpdate) {
        let mut channels = self.channels();
        let Some(sender) = channels.get(&update.match_id) else {
            return;
        };
        match sender.send(update.clone()) {
            Ok(receivers) => debug!(match_id = %update.match_id, receivers, "score update sent"),
            Err(_) => {
                channels.remove(&update.match_id);
                debug!(match_id = %update.match_id, "last subscriber left, topic closed");
            }
        }
    }
}
