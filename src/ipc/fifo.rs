//! Fixed-capacity ring buffer channel built on kernel semaphores.
//!
//! `available` counts occupied slots and is what readers block on; `mutex`
//! serializes cursor updates. When a writer finds the ring full it
//! overwrites the oldest element instead of blocking and bumps the lost
//! counter, so occupancy never exceeds `N`.

use crate::arch::Arch;
use crate::kernel::Kernel;
use crate::sched::Scheduler;
use crate::sync::Semaphore;
use portable_atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoStatus {
    /// Stored in a free slot
    Written,
    /// Ring was full; the oldest element was dropped to make room
    Overwritten,
}

impl FifoStatus {
    /// Numeric status code (`0` for a plain write).
    pub fn code(&self) -> i32 {
        match self {
            FifoStatus::Written => 0,
            FifoStatus::Overwritten => -2,
        }
    }
}

const EMPTY_SLOT: AtomicI32 = AtomicI32::new(0);

/// Single-reader ring buffer of `i32` values.
pub struct Fifo<const N: usize> {
    buffer: [AtomicI32; N],
    /// Read cursor
    head: AtomicUsize,
    /// Write cursor
    tail: AtomicUsize,
    lost: AtomicU32,
    available: Semaphore,
    mutex: Semaphore,
}

impl<const N: usize> Default for Fifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Fifo<N> {
    /// An empty channel, ready for use without `init`.
    pub const fn new() -> Self {
        Self {
            buffer: [EMPTY_SLOT; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            lost: AtomicU32::new(0),
            available: Semaphore::new(0),
            mutex: Semaphore::new(1),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Elements dropped by overwrites since the last `init`.
    pub fn lost(&self) -> u32 {
        self.lost.load(Ordering::Acquire)
    }

    /// Reset cursors and counters, discarding any content.
    pub fn init<A: Arch, S: Scheduler>(&self, kernel: &Kernel<A, S>) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
        self.lost.store(0, Ordering::Release);
        kernel.init_semaphore(&self.available, 0);
        kernel.init_semaphore(&self.mutex, 1);
    }

    /// Pop the oldest element, blocking the calling thread while the ring is empty.
    ///
    /// Call it from a thread: before `launch` nothing can block, and reading an
    /// empty ring returns whatever the slot last held.
    pub fn read<A: Arch, S: Scheduler>(&'static self, kernel: &Kernel<A, S>) -> i32 {
        kernel.wait_semaphore(&self.available);
        kernel.wait_semaphore(&self.mutex);

        let head = self.head.load(Ordering::Acquire);
        let value = self.buffer[head].load(Ordering::Acquire);
        self.head.store((head + 1) % N, Ordering::Release);

        kernel.signal_semaphore(&self.mutex);
        value
    }

    /// Push `value`, overwriting the oldest element if the ring is full.
    pub fn write<A: Arch, S: Scheduler>(&'static self, kernel: &Kernel<A, S>, value: i32) -> FifoStatus {
        kernel.wait_semaphore(&self.mutex);

        let tail = self.tail.load(Ordering::Acquire);
        self.buffer[tail].store(value, Ordering::Release);
        self.tail.store((tail + 1) % N, Ordering::Release);

        let status = if self.available.value() >= N as i32 {
            let head = self.head.load(Ordering::Acquire);
            self.head.store((head + 1) % N, Ordering::Release);
            self.lost.fetch_add(1, Ordering::AcqRel);
            FifoStatus::Overwritten
        } else {
            kernel.signal_semaphore(&self.available);
            FifoStatus::Written
        };

        kernel.signal_semaphore(&self.mutex);
        status
    }

    /// Whether a read would block right now. Never blocks on data.
    pub fn is_empty<A: Arch, S: Scheduler>(&'static self, kernel: &Kernel<A, S>) -> bool {
        kernel.wait_semaphore(&self.mutex);
        let empty = self.available.value() <= 0;
        kernel.signal_semaphore(&self.mutex);
        empty
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        self.available.value().max(0) as usize
    }
}
