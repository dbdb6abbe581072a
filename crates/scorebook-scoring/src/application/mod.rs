//! Application services for the Scoring context.
//!
//! The services mirror the pipeline every mutation follows: the
//! [`event_store::EventStore`] writes a new record version, the
//! [`aggregator::Aggregator`] replays the match, and the
//! [`notifier::ChangeNotifier`] hands the result to subscribers.
//! [`undo_redo::RangeUndoRedo`] drives the same pipeline for bulk
//! retractions.

pub mod aggregator;
pub mod command_handlers;
pub mod event_store;
pub mod locks;
pub mod notifier;
pub mod query_handlers;
pub mod services;
pub mod undo_redo;
