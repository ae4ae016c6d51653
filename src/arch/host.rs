//! Host port.
//!
//! Emulates the interrupt mask and the pending-switch flag with atomics so
//! the kernel can be built and exercised off-target. It cannot transfer
//! control between stacks: `start_first_thread` returns immediately and the
//! embedding code drives `switch_context` itself.

use super::{Arch, InterruptState};
use crate::config::KernelConfig;
use crate::errors::BindError;
use crate::event::EventHandler;
use crate::thread::ThreadEntry;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Atomics-backed port for host builds.
pub struct HostArch {
    enabled: AtomicBool,
    switch_pending: AtomicBool,
    tick_reload: AtomicU32,
}

impl HostArch {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            switch_pending: AtomicBool::new(false),
            tick_reload: AtomicU32::new(0),
        }
    }

    /// Consume the pending-switch flag.
    pub fn take_switch_request(&self) -> bool {
        self.switch_pending.swap(false, Ordering::AcqRel)
    }

    /// Reload value programmed by `start_timer`, zero if never started.
    pub fn tick_reload(&self) -> u32 {
        self.tick_reload.load(Ordering::Acquire)
    }
}

impl Default for HostArch {
    fn default() -> Self {
        Self::new()
    }
}

impl Arch for HostArch {
    fn disable_interrupts(&self) -> InterruptState {
        InterruptState::new(self.enabled.swap(false, Ordering::AcqRel))
    }

    fn restore_interrupts(&self, state: InterruptState) {
        self.enabled.store(state.was_enabled(), Ordering::Release);
    }

    fn interrupts_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn request_switch(&self) {
        self.switch_pending.store(true, Ordering::Release);
    }

    fn init_stack(&self, stack: &mut [u32], entry: ThreadEntry) -> usize {
        // Entry address in the top word stands in for a register frame.
        let top = stack.len() - 1;
        stack[top] = entry as usize as u32;
        stack[top..].as_ptr() as usize
    }

    fn init(&self, _config: &KernelConfig) {}

    fn start_timer(&self, config: &KernelConfig) {
        self.tick_reload.store(config.tick_reload(), Ordering::Release);
    }

    unsafe fn start_first_thread(&self, _sp: usize) {}

    fn bind_interrupt(&self, _irq: u16, _priority: u8, _handler: EventHandler) -> Result<(), BindError> {
        Ok(())
    }
}
