//! Checks applied before binding a handler to an interrupt line.

use crate::config::KernelConfig;
use crate::errors::BindError;

/// Validate an aperiodic binding against the board configuration.
///
/// The line must be an external interrupt, and the priority must stay above
/// the level reserved for the context switch.
pub fn validate_binding(config: &KernelConfig, irq: u16, priority: u8) -> Result<(), BindError> {
    if !config.irq_is_valid(irq) {
        return Err(BindError::IrqInvalid(irq));
    }
    if !config.irq_priority_is_valid(priority) {
        return Err(BindError::HwiPriorityInvalid(priority));
    }
    Ok(())
}
