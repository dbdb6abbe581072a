//! Fan-out boundary for derived state.

/// Hands updates to whatever transport delivers them to subscribers.
///
/// Implementations route each update to the subscribers of its own topic
/// only. Publishing must not block; delivery guarantees belong to the
/// transport.
pub trait Notifier<U>: Send + Sync {
    /// Queues `update` for delivery.
    fn publish(&self, update: &U);
}
