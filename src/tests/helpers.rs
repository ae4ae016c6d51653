//! Test helpers: a recording port and kernel fixtures.

use crate::arch::{Arch, InterruptState};
use crate::config::KernelConfig;
use crate::errors::BindError;
use crate::event::EventHandler;
use crate::kernel::Kernel;
use crate::sched::PriorityRoundRobin;
use crate::thread::{ThreadEntry, ThreadId};
use crate::LaunchError;
use portable_atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::boxed::Box;
use std::sync::Mutex;
use std::vec::Vec;

pub(crate) type TestKernel = Kernel<MockArch, PriorityRoundRobin>;

type SwitchHook = Box<dyn FnOnce() + Send>;

/// Port that records what the kernel asks of the hardware.
pub(crate) struct MockArch {
    enabled: AtomicBool,
    switch_requests: AtomicUsize,
    frames: AtomicUsize,
    tick_reload: AtomicU32,
    initialized: AtomicBool,
    first_sp: AtomicUsize,
    /// External lines with a vector; binding past this fails
    vector_lines: AtomicUsize,
    clobber_canary: AtomicBool,
    bindings: Mutex<Vec<(u16, u8)>>,
    on_switch: Mutex<Option<SwitchHook>>,
}

impl MockArch {
    pub(crate) fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            switch_requests: AtomicUsize::new(0),
            frames: AtomicUsize::new(0),
            tick_reload: AtomicU32::new(0),
            initialized: AtomicBool::new(false),
            first_sp: AtomicUsize::new(0),
            vector_lines: AtomicUsize::new(usize::MAX),
            clobber_canary: AtomicBool::new(false),
            bindings: Mutex::new(Vec::new()),
            on_switch: Mutex::new(None),
        }
    }

    pub(crate) fn switch_requests(&self) -> usize {
        self.switch_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub(crate) fn tick_reload(&self) -> u32 {
        self.tick_reload.load(Ordering::SeqCst)
    }

    pub(crate) fn port_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub(crate) fn first_sp(&self) -> usize {
        self.first_sp.load(Ordering::SeqCst)
    }

    pub(crate) fn bindings(&self) -> Vec<(u16, u8)> {
        self.bindings.lock().unwrap().clone()
    }

    /// Give the port only `lines` external interrupt vectors.
    pub(crate) fn limit_vectors(&self, lines: usize) {
        self.vector_lines.store(lines, Ordering::SeqCst);
    }

    /// Overwrite the bottom word of the next stack handed to `init_stack`,
    /// as an overflowing thread would.
    pub(crate) fn clobber_next_stack(&self) {
        self.clobber_canary.store(true, Ordering::SeqCst);
    }

    /// Run `hook` at the next switch request, standing in for another thread
    /// getting the CPU while the caller is blocked.
    pub(crate) fn on_next_switch(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_switch.lock().unwrap() = Some(Box::new(hook));
    }
}

impl Arch for MockArch {
    fn disable_interrupts(&self) -> InterruptState {
        InterruptState::new(self.enabled.swap(false, Ordering::SeqCst))
    }

    fn restore_interrupts(&self, state: InterruptState) {
        self.enabled.store(state.was_enabled(), Ordering::SeqCst);
    }

    fn interrupts_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn request_switch(&self) {
        assert!(
            self.interrupts_enabled(),
            "switch requested inside a critical section"
        );
        self.switch_requests.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_switch.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn init_stack(&self, stack: &mut [u32], entry: ThreadEntry) -> usize {
        self.frames.fetch_add(1, Ordering::SeqCst);
        if self.clobber_canary.swap(false, Ordering::SeqCst) {
            stack[0] = 0;
        }
        let top = stack.len() - 1;
        stack[top] = entry as usize as u32;
        stack[top..].as_ptr() as usize
    }

    fn init(&self, _config: &KernelConfig) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    fn start_timer(&self, config: &KernelConfig) {
        assert!(!self.interrupts_enabled(), "timer started with interrupts enabled");
        self.tick_reload.store(config.tick_reload(), Ordering::SeqCst);
    }

    unsafe fn start_first_thread(&self, sp: usize) {
        self.first_sp.store(sp, Ordering::SeqCst);
    }

    fn bind_interrupt(&self, irq: u16, priority: u8, _handler: EventHandler) -> Result<(), BindError> {
        if usize::from(irq) >= self.vector_lines.load(Ordering::SeqCst) {
            return Err(BindError::IrqInvalid(irq));
        }
        self.bindings.lock().unwrap().push((irq, priority));
        Ok(())
    }
}

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A leaked, uninitialized kernel.
pub(crate) fn bare_kernel() -> &'static TestKernel {
    init_logger();
    Box::leak(Box::new(Kernel::new(MockArch::new(), PriorityRoundRobin::new())))
}

/// A leaked kernel initialized with the default configuration.
pub(crate) fn kernel() -> &'static TestKernel {
    let kernel = bare_kernel();
    kernel.init(KernelConfig::default()).unwrap();
    kernel
}

pub(crate) fn idle() {}

/// Add one thread per priority, in order, then launch.
pub(crate) fn launched(priorities: &[u8]) -> (&'static TestKernel, Vec<ThreadId>) {
    let kernel = kernel();
    let ids = priorities
        .iter()
        .map(|&priority| kernel.add_thread(idle, priority, "worker").unwrap())
        .collect();
    assert_eq!(kernel.launch(), LaunchError::DispatchReturned);
    (kernel, ids)
}

/// Stand-in for the context-switch interrupt: run one scheduling pass.
pub(crate) fn switch(kernel: &TestKernel) -> Option<ThreadId> {
    kernel.switch_context(0x2000_0000);
    kernel.current_thread_id()
}

/// Advance time by one tick, then run the scheduling pass it requested.
pub(crate) fn tick(kernel: &TestKernel) -> Option<ThreadId> {
    kernel.tick();
    switch(kernel)
}
