//! Test notifier — captures published updates for assertions.

use std::sync::Mutex;

use scorebook_core::notifier::Notifier;

/// A notifier that keeps every update it is handed, in publish order.
#[derive(Debug)]
pub struct RecordingNotifier<U> {
    published: Mutex<Vec<U>>,
}

impl<U> RecordingNotifier<U> {
    /// Creates a notifier with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }
}

impl<U> Default for RecordingNotifier<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Clone> RecordingNotifier<U> {
    /// Returns a snapshot of everything published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<U> {
        self.published.lock().unwrap().clone()
    }
}

impl<U: Clone + Send> Notifier<U> for RecordingNotifier<U> {
    fn publish(&self, update: &U) {
        self.published.lock().unwrap().push(update.clone());
    }
}
