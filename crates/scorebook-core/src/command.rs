//! Command abstractions for ledger mutations.

use uuid::Uuid;

/// A request to mutate the ledger, carried from the boundary into the
/// scoring context.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and spans.
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// Who issued the command; stamped onto every record it writes.
    fn actor(&self) -> &str;
}
