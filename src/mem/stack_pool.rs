//! Statically sized thread stacks.
//!
//! One stack per registry slot, owned by the kernel. A stack belongs to
//! whatever thread occupies its slot; the kernel only hands out a mutable
//! view while the slot is dead and not executing.

use crate::config::{MAX_THREADS, STACK_WORDS};
use core::cell::UnsafeCell;

/// Value painted on the lowest word of every stack.
pub const STACK_CANARY: u32 = 0xC0DE_CAFE;

/// A single thread stack.
#[repr(C, align(8))]
pub struct Stack {
    words: UnsafeCell<[u32; STACK_WORDS]>,
}

impl Stack {
    pub const fn new() -> Self {
        Self {
            words: UnsafeCell::new([0; STACK_WORDS]),
        }
    }

    /// Size of the stack in bytes.
    pub const fn size(&self) -> usize {
        STACK_WORDS * 4
    }

    /// Lowest address of the stack.
    pub fn base(&self) -> usize {
        self.words.get() as usize
    }

    /// Highest address of the stack (exclusive); stacks grow down from here.
    pub fn top(&self) -> usize {
        self.base() + self.size()
    }

    /// Whether the canary word is still intact.
    pub fn check_canary(&self) -> bool {
        // Safety: aligned, in-bounds read of a plain integer
        unsafe { (self.words.get() as *const u32).read_volatile() == STACK_CANARY }
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Stacks for every registry slot.
pub struct StackPool {
    stacks: [Stack; MAX_THREADS],
}

// Access to a slot's stack is serialized by the registry (see `prepare`).
unsafe impl Sync for StackPool {}

impl Default for StackPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StackPool {
    pub const fn new() -> Self {
        const EMPTY: Stack = Stack::new();
        Self {
            stacks: [EMPTY; MAX_THREADS],
        }
    }

    pub fn stack(&self, slot: usize) -> &Stack {
        &self.stacks[slot]
    }

    /// Paint the canary on `slot`'s stack and let `init` build the first frame.
    ///
    /// # Safety
    ///
    /// The slot must be dead and not the current slot, and the caller must
    /// hold the kernel critical section, so no thread is executing on or
    /// reading this stack.
    pub unsafe fn prepare<F>(&self, slot: usize, init: F) -> usize
    where
        F: FnOnce(&mut [u32]) -> usize,
    {
        // Safety: exclusive per the caller's contract
        let words = unsafe { &mut *self.stacks[slot].words.get() };
        words[0] = STACK_CANARY;
        init(&mut words[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;

    #[test]
    fn test_prepare_paints_canary() {
        let pool = Box::new(StackPool::new());
        assert!(!pool.stack(1).check_canary());

        let sp = unsafe { pool.prepare(1, |words| words[words.len() - 4..].as_ptr() as usize) };

        let stack = pool.stack(1);
        assert!(stack.check_canary());
        assert_eq!(sp, stack.top() - 16);
        assert_eq!(stack.top() - stack.base(), STACK_WORDS * 4);
    }

    #[test]
    fn test_stacks_are_aligned() {
        let pool = Box::new(StackPool::new());
        for slot in 0..MAX_THREADS {
            assert_eq!(pool.stack(slot).top() % 8, 0);
        }
    }
}
