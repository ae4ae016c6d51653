//! Thread scheduler implementations.
//!
//! Provides the priority scheduler with round-robin tie-break.

pub mod rr;
pub mod trait_def;

pub use rr::PriorityRoundRobin;
pub use trait_def::{priority, Scheduler};

/// Default scheduler type.
pub type DefaultScheduler = PriorityRoundRobin;
