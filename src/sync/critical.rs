//! Scoped critical sections.

use crate::arch::{Arch, InterruptState};

/// Masks preempting interrupts for as long as it is alive.
///
/// Dropping the guard restores the mask state captured on entry, so sections
/// nest and every exit path (early return, `?`) releases the mask.
#[must_use = "the critical section ends when the guard is dropped"]
pub struct CriticalSection<'a, A: Arch> {
    arch: &'a A,
    state: InterruptState,
}

impl<'a, A: Arch> CriticalSection<'a, A> {
    /// Mask preempting interrupts until the returned guard is dropped.
    pub fn enter(arch: &'a A) -> Self {
        let state = arch.disable_interrupts();
        Self { arch, state }
    }

    /// Mask state that will be restored on drop.
    pub fn prior_state(&self) -> InterruptState {
        self.state
    }
}

impl<A: Arch> Drop for CriticalSection<'_, A> {
    fn drop(&mut self) {
        self.arch.restore_interrupts(self.state);
    }
}
