//! Architecture abstraction layer for context switching and interrupt handling.
//!
//! The portable kernel never touches CPU registers. Everything that does
//! (masking interrupts, pending a context switch, building the first frame
//! of a new thread, programming the tick timer, binding interrupt vectors)
//! goes through [`Arch`], implemented once per port.

use crate::config::KernelConfig;
use crate::errors::BindError;
use crate::event::EventHandler;
use crate::thread::ThreadEntry;

/// Interrupt mask state captured when a critical section is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptState {
    enabled: bool,
}

impl InterruptState {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether preempting interrupts were enabled before masking.
    pub fn was_enabled(self) -> bool {
        self.enabled
    }
}

/// Architecture abstraction trait.
///
/// # Safety
///
/// Implementations involve direct hardware manipulation. `start_first_thread`
/// transfers control to a synthesized frame and has preconditions that the
/// caller must uphold.
pub trait Arch: Sync {
    /// Mask the interrupts that drive preemption, returning the prior state.
    fn disable_interrupts(&self) -> InterruptState;

    /// Restore exactly the state returned by the matching `disable_interrupts`.
    fn restore_interrupts(&self, state: InterruptState);

    /// Check if preempting interrupts are currently enabled.
    fn interrupts_enabled(&self) -> bool;

    /// Pend the low-priority context-switch interrupt.
    ///
    /// The switch happens once no critical section or more urgent handler is
    /// active; this call only flags it.
    fn request_switch(&self);

    /// Synthesize the initial execution frame of a new thread.
    ///
    /// # Arguments
    ///
    /// * `stack` - The thread's private stack; the frame is built at its top
    /// * `entry` - Function the thread starts executing
    ///
    /// # Returns
    ///
    /// The saved stack pointer to store in the thread record. Resuming from it
    /// must be indistinguishable from resuming a preempted thread.
    fn init_stack(&self, stack: &mut [u32], entry: ThreadEntry) -> usize;

    /// Port bring-up run once from `Kernel::init`.
    fn init(&self, config: &KernelConfig);

    /// Program the tick timer and the priorities of the tick and switch interrupts.
    fn start_timer(&self, config: &KernelConfig);

    /// Perform the first context transfer.
    ///
    /// Returns only if the transfer failed.
    ///
    /// # Safety
    ///
    /// - `sp` must come from `init_stack` or a previous context save
    /// - The stack it points into must stay valid for the thread's lifetime
    /// - The kernel's interrupt handlers must be registered before the call
    unsafe fn start_first_thread(&self, sp: usize);

    /// Install `handler` on external interrupt `irq` at `priority` and enable it.
    ///
    /// Fails without touching the hardware if the port has no vector for `irq`.
    fn bind_interrupt(&self, irq: u16, priority: u8, handler: EventHandler) -> Result<(), BindError>;
}

/// Entry points the port's interrupt handlers call into.
///
/// Implemented by [`Kernel`](crate::Kernel) so a port can hold the registered
/// kernel as a trait object without knowing its scheduler type.
pub trait KernelHooks: Sync {
    /// Save `sp` for the outgoing thread and return the stack pointer to resume.
    fn switch_context(&self, sp: usize) -> usize;

    /// One tick of the system timer.
    fn tick(&self);

    /// Called when a thread's entry function returns.
    fn exit_current(&self);
}

pub mod host;

pub use host::HostArch;

#[cfg(all(feature = "cortex-m-port", target_arch = "arm", target_os = "none"))]
pub mod cortex_m;

#[cfg(all(feature = "cortex-m-port", target_arch = "arm", target_os = "none"))]
pub use self::cortex_m::CortexM as DefaultArch;

#[cfg(not(all(feature = "cortex-m-port", target_arch = "arm", target_os = "none")))]
pub use host::HostArch as DefaultArch;
