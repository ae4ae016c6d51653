//! Kernel context and public API.
//!
//! A [`Kernel`] owns every piece of scheduler state: the thread registry,
//! the periodic event pool, the system time, the thread stacks and the FIFO
//! channels. Registry and pool mutations happen inside a critical section
//! with the state lock held; the lock is therefore never contended on a
//! single core and exists to make the shared state `Sync`.

use crate::arch::{Arch, KernelHooks};
use crate::config::{KernelConfig, FIFO_CAPACITY, MAX_FIFOS, MAX_THREADS};
use crate::errors::{BindError, EventError, FifoError, InitError, KillError, LaunchError, SpawnError};
use crate::event::{validate_binding, EventHandler, PeriodicEvents};
use crate::ipc::{Fifo, FifoStatus};
use crate::mem::StackPool;
use crate::sched::{PriorityRoundRobin, Scheduler};
use crate::sync::{CriticalSection, Semaphore};
use crate::thread::{ThreadEntry, ThreadId, ThreadInfo, ThreadTable};
use crate::time::{ms_to_ticks, TickCounter, TIMER_FREQUENCY_HZ};
use portable_atomic::{AtomicBool, Ordering};

/// State guarded by the kernel critical section.
struct KernelState {
    config: KernelConfig,
    threads: ThreadTable,
    periodic: PeriodicEvents,
    launched: bool,
}

/// Main kernel handle.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `S` - Scheduler implementation
pub struct Kernel<A: Arch, S: Scheduler = PriorityRoundRobin> {
    arch: A,
    scheduler: S,
    /// Whether `init` has run
    initialized: AtomicBool,
    /// System time in ticks
    ticks: TickCounter,
    state: spin::Mutex<KernelState>,
    stacks: StackPool,
    fifos: [Fifo<FIFO_CAPACITY>; MAX_FIFOS],
}

impl<A: Arch, S: Scheduler> Kernel<A, S> {
    /// Create a new kernel instance.
    ///
    /// Usable in a `static`; nothing touches hardware until `init`.
    pub const fn new(arch: A, scheduler: S) -> Self {
        const EMPTY_FIFO: Fifo<FIFO_CAPACITY> = Fifo::new();
        Self {
            arch,
            scheduler,
            initialized: AtomicBool::new(false),
            ticks: TickCounter::new(TIMER_FREQUENCY_HZ),
            state: spin::Mutex::new(KernelState {
                config: KernelConfig::DEFAULT,
                threads: ThreadTable::new(),
                periodic: PeriodicEvents::new(),
                launched: false,
            }),
            stacks: StackPool::new(),
            fifos: [EMPTY_FIFO; MAX_FIFOS],
        }
    }

    /// The port this kernel runs on.
    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// Get a reference to the scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Run `f` on the kernel state inside a critical section.
    fn with_state<R>(&self, f: impl FnOnce(&mut KernelState) -> R) -> R {
        let _cs = CriticalSection::enter(&self.arch);
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Initialize the kernel.
    ///
    /// Runs the port's own bring-up (which relocates the vector table), then
    /// the board bring-up hook. Must be called once, before any thread or
    /// event is added.
    pub fn init(&self, config: KernelConfig) -> Result<(), InitError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("init called twice");
            return Err(InitError::AlreadyInitialized);
        }

        self.with_state(|state| state.config = config);
        self.ticks.set_frequency(config.tick_hz);
        self.arch.init(&config);

        if let Some(board_init) = config.board_init {
            board_init();
        }

        log::info!(
            "kernel initialized: {} Hz tick, {} thread slots",
            config.tick_hz,
            MAX_THREADS
        );
        Ok(())
    }

    /// Check if the kernel has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Add a thread.
    ///
    /// # Arguments
    ///
    /// * `entry` - Function the thread runs; returning from it kills the thread
    /// * `priority` - Smaller values are more urgent
    /// * `name` - Debug name, truncated to `MAX_NAME_LENGTH` bytes
    ///
    /// # Returns
    ///
    /// The new thread's identifier. The thread is eligible at the next
    /// scheduling pass.
    pub fn add_thread(&self, entry: ThreadEntry, priority: u8, name: &str) -> Result<ThreadId, SpawnError> {
        if !self.is_initialized() {
            return Err(SpawnError::NotInitialized);
        }

        let result = self.with_state(|state| -> Result<ThreadId, SpawnError> {
            let slot = state.threads.free_slot()?;
            // Safety: `free_slot` only returns dead, non-current slots and we
            // hold the critical section.
            let sp = unsafe {
                self.stacks
                    .prepare(slot, |stack| self.arch.init_stack(stack, entry))
            };
            Ok(state.threads.insert(slot, sp, priority, name))
        });

        match result {
            Ok(id) => log::debug!("added thread {} '{}' priority {}", id, name, priority),
            Err(SpawnError::ThreadsIncorrectlyAlive) => {
                log::error!("thread registry inconsistent while adding '{}'", name)
            }
            Err(err) => log::warn!("cannot add thread '{}': {}", name, err),
        }
        result
    }

    /// Kill the thread `id`.
    ///
    /// If `id` is the calling thread, a switch is requested and the call does
    /// not return to it. A thread blocked on a semaphore gives its place
    /// back: the semaphore's count is incremented.
    pub fn kill_thread(&self, id: ThreadId) -> Result<(), KillError> {
        let result = self.with_state(|state| -> Result<bool, KillError> {
            let slot = state.threads.slot_of(id).ok_or(KillError::ThreadDoesNotExist)?;
            if state.threads.alive_count() <= 1 {
                return Err(KillError::CannotKillLastThread);
            }
            if let Some(sem) = state.threads.remove(slot) {
                sem.increment();
            }
            Ok(state.threads.current() == Some(slot))
        });

        match result {
            Ok(was_current) => {
                log::debug!("killed thread {}", id);
                if was_current {
                    self.yield_now();
                }
                Ok(())
            }
            Err(err) => {
                log::warn!("cannot kill thread {}: {}", id, err);
                Err(err)
            }
        }
    }

    /// Kill the calling thread.
    pub fn kill_self(&self) -> Result<(), KillError> {
        let id = self.current_thread_id().ok_or(KillError::NotLaunched)?;
        self.kill_thread(id)
    }

    /// Kill every alive thread except the calling one.
    ///
    /// # Returns
    ///
    /// The number of threads killed.
    pub fn kill_all_other(&self) -> Result<usize, KillError> {
        let killed = self.with_state(|state| -> Result<usize, KillError> {
            let current = state.threads.current().ok_or(KillError::NotLaunched)?;
            if !state.threads.tcb(current).is_alive() {
                return Err(KillError::ThreadDoesNotExist);
            }

            let mut killed = 0;
            for slot in 0..MAX_THREADS {
                if slot != current && state.threads.tcb(slot).is_alive() {
                    if let Some(sem) = state.threads.remove(slot) {
                        sem.increment();
                    }
                    killed += 1;
                }
            }
            Ok(killed)
        })?;

        log::debug!("killed {} other threads", killed);
        Ok(killed)
    }

    /// Identifier of the calling thread, `None` before launch.
    pub fn current_thread_id(&self) -> Option<ThreadId> {
        self.with_state(|state| state.threads.current_id())
    }

    /// Put the calling thread to sleep for at least `ms` milliseconds.
    ///
    /// The thread becomes eligible again at the tick where the duration has
    /// elapsed. `sleep(0)` only yields.
    pub fn sleep(&self, ms: u32) {
        let ticks = ms_to_ticks(ms, self.ticks.frequency());
        if ticks > 0 {
            self.with_state(|state| {
                if let Some(current) = state.threads.current() {
                    let wake = self.ticks.ticks() + ticks;
                    state.threads.tcb_mut(current).sleep_until(wake);
                }
            });
        }
        self.yield_now();
    }

    /// Request a scheduling pass.
    #[inline]
    pub fn yield_now(&self) {
        self.arch.request_switch();
    }

    /// Register a handler run from the tick interrupt every `period` ticks.
    ///
    /// The first run happens `period` ticks from now. Handlers must not block.
    pub fn add_periodic_event(&self, handler: EventHandler, period: u32) -> Result<(), EventError> {
        if !self.is_initialized() {
            return Err(EventError::NotInitialized);
        }

        let result = self.with_state(|state| state.periodic.add(handler, period, self.ticks.ticks()));
        match result {
            Ok(()) => log::debug!("added periodic event every {} ticks", period),
            Err(err) => log::warn!("cannot add periodic event: {}", err),
        }
        result
    }

    /// Bind `handler` to external interrupt `irq` at hardware `priority`.
    ///
    /// Invalid lines or priorities are rejected before anything is touched.
    pub fn add_aperiodic_event(&self, handler: EventHandler, priority: u8, irq: u16) -> Result<(), BindError> {
        if !self.is_initialized() {
            return Err(BindError::NotInitialized);
        }

        let config = self.with_state(|state| state.config);
        if let Err(err) = validate_binding(&config, irq, priority) {
            log::warn!("cannot bind interrupt: {}", err);
            return Err(err);
        }

        let bound = {
            let _cs = CriticalSection::enter(&self.arch);
            self.arch.bind_interrupt(irq, priority, handler)
        };
        match bound {
            Ok(()) => log::debug!("bound IRQ {} at priority {}", irq, priority),
            Err(err) => log::warn!("port cannot bind interrupt: {}", err),
        }
        bound
    }

    /// Start scheduling.
    ///
    /// Dispatches the alive thread with the smallest priority value (pool
    /// order breaks ties) after starting the tick timer. On success this never
    /// returns; the returned value says why it did.
    pub fn launch(&self) -> LaunchError {
        if !self.is_initialized() {
            return LaunchError::NotInitialized;
        }

        let prepared = self.with_state(|state| -> Result<(usize, usize, KernelConfig), LaunchError> {
            if state.launched {
                return Err(LaunchError::AlreadyLaunched);
            }
            let first = self
                .scheduler
                .pick_first(&state.threads)
                .ok_or(LaunchError::NoThreadsScheduled)?;
            state.threads.set_current(first);
            state.launched = true;
            Ok((first, state.threads.tcb(first).sp, state.config))
        });

        let (first, sp, config) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                log::warn!("launch refused: {}", err);
                return err;
            }
        };

        log::info!("launching, first thread in slot {}", first);

        // Masked until the first thread enables interrupts itself.
        let cs = CriticalSection::enter(&self.arch);
        self.arch.start_timer(&config);
        // Safety: `sp` was produced by `init_stack` for an alive thread whose
        // stack lives as long as the kernel.
        unsafe { self.arch.start_first_thread(sp) };
        drop(cs);

        log::error!("first context switch returned");
        LaunchError::DispatchReturned
    }

    /// One tick of the system timer. Called from the tick interrupt.
    ///
    /// Advances time, runs due periodic handlers, wakes sleepers whose time
    /// has come and requests a scheduling pass.
    pub fn tick(&self) {
        let (now, due) = self.with_state(|state| {
            let now = self.ticks.increment();
            (now, state.periodic.collect_due(now))
        });

        for handler in due {
            handler();
        }

        self.with_state(|state| state.threads.wake_sleepers(now));
        self.arch.request_switch();
    }

    /// Scheduling pass, called from the context-switch interrupt.
    ///
    /// # Arguments
    ///
    /// * `sp` - Saved stack pointer of the outgoing thread
    ///
    /// # Returns
    ///
    /// The stack pointer to resume. If nothing is eligible the outgoing
    /// context is resumed.
    pub fn switch_context(&self, sp: usize) -> usize {
        let (next_sp, stalled) = self.with_state(|state| {
            let Some(current) = state.threads.current() else {
                return (sp, false);
            };
            if state.threads.tcb(current).is_alive() {
                state.threads.tcb_mut(current).sp = sp;
            }

            match self.scheduler.pick_next(&state.threads) {
                Some(next) => {
                    state.threads.set_current(next);
                    (state.threads.tcb(next).sp, false)
                }
                None => (sp, true),
            }
        });

        if stalled {
            log::error!("no eligible thread, resuming the outgoing context");
        }
        next_sp
    }

    /// Set a semaphore's counter.
    pub fn init_semaphore(&self, sem: &Semaphore, value: i32) {
        let _cs = CriticalSection::enter(&self.arch);
        sem.set(value);
    }

    /// Take one unit of `sem`, blocking the calling thread if none is left.
    ///
    /// A blocked thread stays alive but is skipped by the scheduler until a
    /// matching `signal_semaphore`.
    ///
    /// Before `launch` there is no thread to block: a unit is taken if one is
    /// available, otherwise the counter is left unchanged and the call
    /// returns without having acquired anything.
    pub fn wait_semaphore(&self, sem: &'static Semaphore) {
        let outcome = self.with_state(|state| {
            let Some(current) = state.threads.current() else {
                if sem.value() > 0 {
                    sem.decrement();
                    return Some(false);
                }
                return None;
            };
            if sem.decrement() >= 0 {
                return Some(false);
            }
            state.threads.tcb_mut(current).block_on(sem);
            Some(true)
        });

        match outcome {
            Some(true) => self.yield_now(),
            Some(false) => {}
            None => log::warn!("semaphore wait before launch would block, ignored"),
        }
    }

    /// Return one unit to `sem`, releasing one blocked thread if any.
    ///
    /// The released thread is the first one blocked on `sem` found walking
    /// the alive list from just past the calling thread.
    pub fn signal_semaphore(&self, sem: &Semaphore) {
        self.with_state(|state| {
            if sem.increment() < 0 {
                state.threads.release_waiter(sem);
            }
        });
    }

    fn channel(&self, channel: usize) -> Result<&Fifo<FIFO_CAPACITY>, FifoError> {
        self.fifos.get(channel).ok_or_else(|| {
            log::warn!("FIFO channel {} out of range", channel);
            FifoError::BadChannel(channel)
        })
    }

    /// Reset FIFO `channel` to empty.
    pub fn init_fifo(&self, channel: usize) -> Result<(), FifoError> {
        self.channel(channel)?.init(self);
        log::debug!("FIFO {} initialized", channel);
        Ok(())
    }

    /// Pop the oldest value from FIFO `channel`, blocking while it is empty.
    pub fn read_fifo(&'static self, channel: usize) -> Result<i32, FifoError> {
        Ok(self.channel(channel)?.read(self))
    }

    /// Push `value` to FIFO `channel`, overwriting the oldest value if it is full.
    pub fn write_fifo(&'static self, channel: usize, value: i32) -> Result<FifoStatus, FifoError> {
        let status = self.channel(channel)?.write(self, value);
        if status == FifoStatus::Overwritten {
            log::warn!("FIFO {} full, oldest value overwritten", channel);
        }
        Ok(status)
    }

    /// Whether a read from `channel` would block.
    pub fn fifo_is_empty(&'static self, channel: usize) -> Result<bool, FifoError> {
        Ok(self.channel(channel)?.is_empty(self))
    }

    /// Values lost to overwrites on `channel` since it was initialized.
    pub fn fifo_lost(&self, channel: usize) -> Result<u32, FifoError> {
        Ok(self.channel(channel)?.lost())
    }

    /// Ticks since launch.
    pub fn system_time(&self) -> u64 {
        self.ticks.ticks()
    }

    /// Number of alive threads.
    pub fn thread_count(&self) -> usize {
        self.with_state(|state| state.threads.alive_count())
    }

    /// Snapshot of an alive thread.
    pub fn thread_info(&self, id: ThreadId) -> Option<ThreadInfo> {
        self.with_state(|state| {
            let slot = state.threads.slot_of(id)?;
            state.threads.info(slot)
        })
    }

    /// Snapshots of every alive thread, in list order.
    pub fn threads(&self) -> heapless::Vec<ThreadInfo, MAX_THREADS> {
        self.with_state(|state| {
            let mut out = heapless::Vec::new();
            if let Some(start) = state.threads.first_alive() {
                for slot in state.threads.iter_from(start) {
                    if let Some(info) = state.threads.info(slot) {
                        let _ = out.push(info);
                    }
                }
            }
            out
        })
    }

    /// Whether the canary at the bottom of thread `id`'s stack is intact.
    pub fn stack_intact(&self, id: ThreadId) -> Option<bool> {
        self.with_state(|state| {
            let slot = state.threads.slot_of(id)?;
            Some(self.stacks.stack(slot).check_canary())
        })
    }
}

impl<A: Arch, S: Scheduler> KernelHooks for Kernel<A, S> {
    fn switch_context(&self, sp: usize) -> usize {
        Kernel::switch_context(self, sp)
    }

    fn tick(&self) {
        Kernel::tick(self)
    }

    fn exit_current(&self) {
        if let Err(err) = self.kill_self() {
            log::error!("thread returned and could not be removed: {}", err);
        }
    }
}
