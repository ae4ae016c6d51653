//! Counting semaphore storage.
//!
//! A semaphore is a single signed counter. Zero or above is available
//! capacity; below zero is the number of threads blocked on it. The blocking
//! protocol lives on [`Kernel`](crate::Kernel) (`init_semaphore`,
//! `wait_semaphore`, `signal_semaphore`) because waking and blocking touch
//! the thread registry.

use core::fmt;
use portable_atomic::{AtomicI32, Ordering};

/// Counting semaphore.
///
/// Usually a `static`; blocked threads refer to it by address.
pub struct Semaphore {
    count: AtomicI32,
}

impl Semaphore {
    pub const fn new(value: i32) -> Self {
        Self {
            count: AtomicI32::new(value),
        }
    }

    /// Current counter value.
    pub fn value(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, value: i32) {
        self.count.store(value, Ordering::Release);
    }

    /// Decrement, returning the new value.
    pub(crate) fn decrement(&self) -> i32 {
        self.count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Increment, returning the value before the increment.
    pub(crate) fn increment(&self) -> i32 {
        self.count.fetch_add(1, Ordering::AcqRel)
    }

    /// Whether two references name the same semaphore.
    pub fn same(&self, other: &Semaphore) -> bool {
        core::ptr::eq(self, other)
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("count", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_arithmetic() {
        let sem = Semaphore::new(1);
        assert_eq!(sem.decrement(), 0);
        assert_eq!(sem.decrement(), -1);
        assert_eq!(sem.increment(), -1);
        assert_eq!(sem.value(), 0);
        sem.set(3);
        assert_eq!(sem.value(), 3);
    }

    #[test]
    fn test_identity_is_by_address() {
        let a = Semaphore::new(0);
        let b = Semaphore::new(0);
        assert!(a.same(&a));
        assert!(!a.same(&b));
    }
}
