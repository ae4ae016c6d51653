//! Priority scheduler with round-robin tie-break.
//!
//! Each pass walks the alive list once, starting just past the thread that
//! was running, and keeps the first eligible thread with the smallest
//! priority value. Strictly more urgent threads always win; equal ones take
//! turns because the walk start rotates with the running thread.

use super::Scheduler;
use crate::thread::ThreadTable;

/// Linear-scan priority scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityRoundRobin;

impl PriorityRoundRobin {
    pub const fn new() -> Self {
        Self
    }

    /// First slot in `slots` that minimizes priority among those accepted by `filter`.
    fn min_priority(
        threads: &ThreadTable,
        slots: impl Iterator<Item = usize>,
        filter: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        let mut best: Option<(usize, u8)> = None;
        for slot in slots.filter(|&slot| filter(slot)) {
            let priority = threads.tcb(slot).priority();
            match best {
                // Strict comparison keeps the first one seen on a tie.
                Some((_, current)) if current <= priority => {}
                _ => best = Some((slot, priority)),
            }
        }
        best.map(|(slot, _)| slot)
    }
}

impl Scheduler for PriorityRoundRobin {
    fn pick_next(&self, threads: &ThreadTable) -> Option<usize> {
        let start = threads.scan_start()?;
        Self::min_priority(threads, threads.iter_from(start), |slot| {
            threads.tcb(slot).is_eligible()
        })
    }

    fn pick_first(&self, threads: &ThreadTable) -> Option<usize> {
        let pool_order = 0..crate::config::MAX_THREADS;
        Self::min_priority(threads, pool_order, |slot| threads.tcb(slot).is_alive())
    }
}
