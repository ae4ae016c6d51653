//! Cortex-M3/M4 port.
//!
//! - Critical sections mask with PRIMASK.
//! - SysTick drives the tick; PendSV performs the context switch.
//! - Threads run on PSP, handlers on MSP.
//! - The vector table is copied to RAM at `init` so aperiodic handlers can
//!   be bound at run time.
//!
//! Floating point registers are not part of the saved context; build for a
//! soft-float target or keep FPU use out of threads.

use super::{Arch, InterruptState, KernelHooks};
use crate::config::KernelConfig;
use crate::errors::BindError;
use crate::event::EventHandler;
use crate::thread::ThreadEntry;
use core::cell::UnsafeCell;
use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{NVIC, SCB};
use cortex_m_rt::exception;
use portable_atomic::{AtomicU8, Ordering};

/// Words in a saved context: r4-r11 followed by the hardware exception frame.
const FRAME_WORDS: usize = 16;

/// xPSR with only the Thumb bit set.
const XPSR_THUMB: u32 = 0x0100_0000;

/// 16 system exceptions followed by the external lines.
const VECTOR_COUNT: usize = 16 + 64;

#[repr(C, align(512))]
struct VectorTable(UnsafeCell<[usize; VECTOR_COUNT]>);

// Only written with interrupts masked, during `init` or `bind_interrupt`.
unsafe impl Sync for VectorTable {}

static RAM_VECTORS: VectorTable = VectorTable(UnsafeCell::new([0; VECTOR_COUNT]));

/// Kernel the exception handlers dispatch to.
static KERNEL: spin::Once<&'static dyn KernelHooks> = spin::Once::new();

/// Register the kernel the PendSV and SysTick handlers call into.
///
/// Must happen before `launch`. Only the first registration takes effect.
pub fn register_kernel(kernel: &'static dyn KernelHooks) {
    KERNEL.call_once(|| kernel);
}

#[derive(Clone, Copy)]
struct Irq(u16);

// Values are validated against the configured external range before use.
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

/// Cortex-M3/M4 implementation of [`Arch`].
pub struct CortexM {
    priority_bits: AtomicU8,
}

impl CortexM {
    pub const fn new() -> Self {
        Self {
            priority_bits: AtomicU8::new(3),
        }
    }
}

impl Default for CortexM {
    fn default() -> Self {
        Self::new()
    }
}

/// NVIC priority value for a logical priority with `bits` implemented bits.
fn hw_priority(priority: u8, bits: u8) -> u8 {
    let shift = 8u32.saturating_sub(u32::from(bits));
    ((u32::from(priority) << shift) & 0xFF) as u8
}

impl Arch for CortexM {
    fn disable_interrupts(&self) -> InterruptState {
        let enabled = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        InterruptState::new(enabled)
    }

    fn restore_interrupts(&self, state: InterruptState) {
        if state.was_enabled() {
            // Safety: re-enables only what `disable_interrupts` found enabled
            unsafe { cortex_m::interrupt::enable() };
        }
    }

    fn interrupts_enabled(&self) -> bool {
        cortex_m::register::primask::read().is_active()
    }

    fn request_switch(&self) {
        SCB::set_pendsv();
        // Taken before the next instruction when nothing masks it.
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    fn init_stack(&self, stack: &mut [u32], entry: ThreadEntry) -> usize {
        let start = stack.len() - FRAME_WORDS;
        let frame = &mut stack[start..];
        frame.fill(0);
        frame[13] = (thread_exit as extern "C" fn() -> !) as usize as u32;
        frame[14] = (entry as usize as u32) & !1;
        frame[15] = XPSR_THUMB;
        frame.as_ptr() as usize
    }

    fn init(&self, config: &KernelConfig) {
        self.priority_bits.store(config.priority_bits, Ordering::Relaxed);

        // Safety: the kernel is the only user of SCB during bring-up
        let peripherals = unsafe { cortex_m::Peripherals::steal() };
        let table = RAM_VECTORS.0.get() as *mut usize;
        let current = peripherals.SCB.vtor.read() as usize as *const usize;

        for i in 0..VECTOR_COUNT {
            // Safety: both tables hold at least VECTOR_COUNT entries
            unsafe { table.add(i).write_volatile(current.add(i).read_volatile()) };
        }

        // Safety: the RAM copy is a complete, suitably aligned vector table
        unsafe { peripherals.SCB.vtor.write(table as usize as u32) };
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    fn start_timer(&self, config: &KernelConfig) {
        // Safety: SYST and the SCB priority registers belong to the kernel
        let mut peripherals = unsafe { cortex_m::Peripherals::steal() };

        // Tick outranks the switch so time bookkeeping is never cut by a switch.
        unsafe {
            peripherals.SCB.set_priority(
                SystemHandler::SysTick,
                hw_priority(config.tick_priority, config.priority_bits),
            );
            peripherals.SCB.set_priority(
                SystemHandler::PendSV,
                hw_priority(config.switch_priority, config.priority_bits),
            );
        }

        let syst = &mut peripherals.SYST;
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(config.tick_reload());
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
    }

    unsafe fn start_first_thread(&self, sp: usize) {
        // Switch thread mode to PSP, unstack the synthesized frame by hand
        // and branch to the entry point.
        unsafe {
            core::arch::asm!(
                "msr psp, r0",
                "movs r1, #2",
                "msr control, r1",
                "isb",
                "pop {{r4-r11}}",
                "pop {{r0-r3}}",
                "pop {{r12}}",
                "pop {{lr}}",
                "pop {{r1}}",
                "pop {{r2}}",
                "orr r1, r1, #1",
                "cpsie i",
                "bx r1",
                in("r0") sp,
                options(noreturn),
            );
        }
    }

    fn bind_interrupt(&self, irq: u16, priority: u8, handler: EventHandler) -> Result<(), BindError> {
        let index = 16 + usize::from(irq);
        if index >= VECTOR_COUNT {
            return Err(BindError::IrqInvalid(irq));
        }

        let table = RAM_VECTORS.0.get() as *mut usize;
        // Safety: index checked above; the line is still masked in the NVIC
        unsafe { table.add(index).write_volatile(handler as usize) };

        let prio = hw_priority(priority, self.priority_bits.load(Ordering::Relaxed));
        // Safety: priority validated by the kernel against its configuration
        let mut peripherals = unsafe { cortex_m::Peripherals::steal() };
        unsafe {
            peripherals.NVIC.set_priority(Irq(irq), prio);
            NVIC::unmask(Irq(irq));
        }
        Ok(())
    }
}

/// Called by PendSV with the outgoing thread's PSP after r4-r11 were pushed.
extern "C" fn pendsv_switch(sp: usize) -> usize {
    match KERNEL.get() {
        Some(kernel) => kernel.switch_context(sp),
        None => sp,
    }
}

/// Return address of every thread entry function.
extern "C" fn thread_exit() -> ! {
    if let Some(kernel) = KERNEL.get() {
        kernel.exit_current();
    }
    loop {
        cortex_m::asm::wfi();
    }
}

core::arch::global_asm!(
    ".section .text.PendSV, \"ax\"",
    ".global PendSV",
    ".type PendSV, %function",
    ".thumb_func",
    "PendSV:",
    "    cpsid i",
    "    mrs r0, psp",
    "    stmdb r0!, {{r4-r11}}",
    "    push {{r3, lr}}",
    "    bl {switch}",
    "    pop {{r3, lr}}",
    "    ldmia r0!, {{r4-r11}}",
    "    msr psp, r0",
    "    cpsie i",
    "    bx lr",
    switch = sym pendsv_switch,
);

#[exception]
fn SysTick() {
    if let Some(kernel) = KERNEL.get() {
        kernel.tick();
    }
}
