//! Replay abstraction for read models derived from the ledger.

use crate::delivery::EventRecord;

/// A read model built by folding active records in `(over, ball)` order.
///
/// Projections hold no persisted state; they are rebuilt from scratch on
/// every read.
pub trait Projection {
    /// Folds one visible record into the projection.
    fn apply(&mut self, record: &EventRecord);

    /// Folds every non-tombstoned record, in the order given.
    #[must_use]
    fn replay<'a, I>(mut self, records: I) -> Self
    where
        Self: Sized,
        I: IntoIterator<Item = &'a EventRecord>,
    {
        for record in records.into_iter().filter(|r| !r.is_tombstoned()) {
            self.apply(record);
        }
        self
    }
}
