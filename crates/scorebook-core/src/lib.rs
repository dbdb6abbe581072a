//! Scorebook Core — shared domain abstractions.
//!
//! This crate defines the delivery ledger's record types, the error
//! taxonomy, and the storage and notification contracts that the scoring
//! context depends on. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod delivery;
pub mod error;
pub mod notifier;
pub mod projection;
pub mod repository;
pub mod undo;
