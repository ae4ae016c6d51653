//! Thread records, identifiers and the thread registry.

use crate::config::MAX_NAME_LENGTH;
use crate::sync::Semaphore;
use core::num::NonZeroU64;

pub mod table;

pub use table::{AliveIter, ThreadTable};

/// Function a thread starts executing.
pub type ThreadEntry = fn();

/// Debug name of a thread, truncated to `MAX_NAME_LENGTH` bytes.
pub type ThreadName = heapless::String<MAX_NAME_LENGTH>;

/// Unique thread identifier.
///
/// The low 16 bits hold the registry slot, the rest a generation counter that
/// increases on every add, so identifiers are never reused even when slots are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(NonZeroU64);

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.generation(), self.slot())
    }
}

impl ThreadId {
    const SLOT_BITS: u32 = 16;

    /// Create an identifier. `generation` must be non-zero.
    pub(crate) fn new(generation: u64, slot: usize) -> Self {
        let raw = (generation << Self::SLOT_BITS) | (slot as u64 & 0xFFFF);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Registry slot this identifier was issued for.
    pub fn slot(self) -> usize {
        (self.0.get() & 0xFFFF) as usize
    }

    /// Generation counter folded into the identifier.
    pub fn generation(self) -> u64 {
        self.0.get() >> Self::SLOT_BITS
    }

    /// Get the raw ID value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Scheduling state of a thread as seen from outside the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Eligible, waiting for the scheduler
    Ready,
    /// The current thread
    Running,
    /// Waiting for its wake tick
    Sleeping,
    /// Waiting on a semaphore
    Blocked,
    /// Free record
    Dead,
}

/// Snapshot of one thread record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: ThreadName,
    pub priority: u8,
    pub state: ThreadState,
}

/// One slot of the thread registry.
pub struct ThreadControlBlock {
    /// Saved stack pointer, valid while the thread is not running
    pub(crate) sp: usize,
    next: usize,
    prev: usize,
    alive: bool,
    /// Smaller is more urgent
    priority: u8,
    asleep: bool,
    wake_tick: u64,
    blocked_on: Option<&'static Semaphore>,
    id: Option<ThreadId>,
    name: ThreadName,
}

impl ThreadControlBlock {
    pub(crate) const EMPTY: Self = Self {
        sp: 0,
        next: 0,
        prev: 0,
        alive: false,
        priority: 0,
        asleep: false,
        wake_tick: 0,
        blocked_on: None,
        id: None,
        name: ThreadName::new(),
    };

    pub fn id(&self) -> Option<ThreadId> {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn wake_tick(&self) -> u64 {
        self.wake_tick
    }

    pub fn blocked_on(&self) -> Option<&'static Semaphore> {
        self.blocked_on
    }

    /// Alive, awake and not waiting on a semaphore.
    pub fn is_eligible(&self) -> bool {
        self.alive && !self.asleep && self.blocked_on.is_none()
    }

    pub fn next(&self) -> usize {
        self.next
    }

    pub fn prev(&self) -> usize {
        self.prev
    }

    pub(crate) fn sleep_until(&mut self, tick: u64) {
        self.wake_tick = tick;
        self.asleep = true;
    }

    pub(crate) fn block_on(&mut self, sem: &'static Semaphore) {
        self.blocked_on = Some(sem);
    }

    pub(crate) fn unblock(&mut self) {
        self.blocked_on = None;
    }
}

/// Copy `name` into a `ThreadName`, dropping whatever does not fit.
pub fn truncate_name(name: &str) -> ThreadName {
    let mut out = ThreadName::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
