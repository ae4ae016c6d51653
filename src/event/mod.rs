//! Periodic and aperiodic event dispatch.
//!
//! Periodic handlers run synchronously inside the tick interrupt; aperiodic
//! handlers are bound straight to an external interrupt line. Neither may
//! block.

pub mod aperiodic;
pub mod periodic;

pub use aperiodic::validate_binding;
pub use periodic::{DueHandlers, PeriodicEvent, PeriodicEvents};

/// Handler run from interrupt context.
pub type EventHandler = fn();
