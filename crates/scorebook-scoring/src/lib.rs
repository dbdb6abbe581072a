//! Scorebook — Scoring bounded context.
//!
//! Responsible for recording versioned deliveries, folding the active
//! records of a match into its score, retracting and reinstating ranges of
//! deliveries, and handing every resulting score to subscribers.

pub mod application;
pub mod config;
pub mod domain;
