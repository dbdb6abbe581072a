//! Shared test doubles for the Scorebook workspace.

mod clock;
mod notifier;
mod repository;

pub use clock::{AdvancingClock, FixedClock};
pub use notifier::RecordingNotifier;
pub use repository::{
    ConflictingDeliveryRepository, FailingDeliveryRepository, FailingReadsDeliveryRepository,
    FailingUndoOperationRepository, FlakyDeliveryRepository, SlowReadDeliveryRepository,
};
