#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(unreachable_pub)]

//! Preemptive real-time kernel for single-core microcontrollers.
//!
//! Threads are scheduled by strict priority (smaller value is more urgent)
//! with round-robin rotation among equal priorities. The kernel also
//! provides counting semaphores, tick-driven sleep and periodic events,
//! interrupt-bound aperiodic events, and fixed-size FIFO channels.
//!
//! # Target Platform
//!
//! - **Architecture**: ARMv7-M (Cortex-M3/M4), bare metal
//! - **Tick**: SysTick, 1 ms by default
//! - **Context switch**: PendSV at the lowest priority
//!
//! # Features
//!
//! - `cortex-m-port`: Cortex-M port, active on `target_os = "none"` ARM targets (default)
//! - `std-shim`: Host builds use the atomics-backed host port
//!
//! # Quick Start
//!
//! ```ignore
//! use preemptive_rtos::arch::cortex_m::{register_kernel, CortexM};
//! use preemptive_rtos::{priority, Kernel, KernelConfig, PriorityRoundRobin};
//!
//! static KERNEL: Kernel<CortexM> = Kernel::new(CortexM::new(), PriorityRoundRobin::new());
//!
//! fn idle() {
//!     loop {}
//! }
//!
//! fn blink() {
//!     loop {
//!         toggle_led();
//!         KERNEL.sleep(500);
//!     }
//! }
//!
//! fn kernel_main() -> ! {
//!     KERNEL.init(KernelConfig::default()).expect("init");
//!     register_kernel(&KERNEL);
//!
//!     KERNEL.add_thread(idle, priority::IDLE, "idle").expect("idle");
//!     KERNEL.add_thread(blink, priority::NORMAL, "blink").expect("blink");
//!
//!     let err = KERNEL.launch();
//!     panic!("launch failed: {}", err);
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Kernel`] owns all state; every mutation runs in a [`CriticalSection`]
//! - [`Arch`] is the hardware seam (masking, switch request, first frame, timer)
//! - [`Scheduler`] picks the next thread from the [`ThreadTable`]
//! - Nothing allocates; every pool is a fixed array sized in [`config`]

pub mod arch;
pub mod config;
pub mod errors;
pub mod event;
pub mod ipc;
pub mod kernel;
pub mod mem;
pub mod sched;
pub mod sync;
pub mod thread;
pub mod time;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests;

// Panic handler for bare-metal
#[cfg(all(not(test), target_os = "none", not(feature = "std-shim")))]
use core::panic::PanicInfo;

#[cfg(all(not(test), target_os = "none", not(feature = "std-shim")))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("kernel panic: {}", info);
    loop {
        #[cfg(all(feature = "cortex-m-port", target_arch = "arm"))]
        {
            cortex_m::interrupt::disable();
            cortex_m::asm::wfi();
        }
        #[cfg(not(all(feature = "cortex-m-port", target_arch = "arm")))]
        core::hint::spin_loop();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, DefaultArch, HostArch, InterruptState, KernelHooks};

// Kernel
pub use kernel::Kernel;
pub use config::KernelConfig;

// Scheduler
pub use sched::{priority, PriorityRoundRobin, Scheduler};

// Threads
pub use thread::{ThreadEntry, ThreadId, ThreadInfo, ThreadState, ThreadTable};

// Synchronization and IPC
pub use ipc::{Fifo, FifoStatus};
pub use sync::{CriticalSection, Semaphore};

// Events
pub use event::EventHandler;

// Errors
pub use errors::{
    BindError, EventError, FifoError, InitError, KernelError, KernelResult, KillError,
    LaunchError, SpawnError,
};
