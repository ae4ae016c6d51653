//! Scheduler trait definition.

use crate::thread::ThreadTable;

/// Thread selection policy.
///
/// Both methods run inside a kernel critical section and return a registry
/// slot. They only read the table; the kernel updates `current`.
pub trait Scheduler: Send + Sync {
    /// Pick the thread to resume at a scheduling pass.
    ///
    /// # Returns
    ///
    /// The slot of an eligible thread, or `None` if every alive thread is
    /// asleep or blocked.
    fn pick_next(&self, threads: &ThreadTable) -> Option<usize>;

    /// Pick the thread `launch` dispatches first.
    fn pick_first(&self, threads: &ThreadTable) -> Option<usize>;
}

/// Conventional priority values. Smaller is more urgent.
pub mod priority {
    /// Time-critical handlers
    pub const HIGHEST: u8 = 0;

    /// Default for application threads
    pub const NORMAL: u8 = 128;

    /// Idle thread, always ready, runs when nothing else is
    pub const IDLE: u8 = 255;
}
