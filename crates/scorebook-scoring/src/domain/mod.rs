//! Domain model for the Scoring context.

pub mod aggregates;
pub mod commands;
pub mod intent;
pub mod range;
