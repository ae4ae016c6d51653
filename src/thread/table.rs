//! Fixed-capacity thread registry.
//!
//! Alive records form one circular doubly-linked list threaded through the
//! slot array by index. Dead records keep their old links so that a thread
//! killing itself can still be scanned past until the pending switch runs.

use super::{truncate_name, ThreadControlBlock, ThreadId, ThreadInfo, ThreadState};
use crate::config::MAX_THREADS;
use crate::errors::SpawnError;
use crate::sync::Semaphore;

pub struct ThreadTable {
    tcbs: [ThreadControlBlock; MAX_THREADS],
    alive: usize,
    current: Option<usize>,
    generation: u64,
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTable {
    pub const fn new() -> Self {
        const EMPTY: ThreadControlBlock = ThreadControlBlock::EMPTY;
        Self {
            tcbs: [EMPTY; MAX_THREADS],
            alive: 0,
            current: None,
            generation: 1,
        }
    }

    /// Number of alive records.
    pub fn alive_count(&self) -> usize {
        self.alive
    }

    /// Slot of the record that is executing, once launched.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub(crate) fn set_current(&mut self, slot: usize) {
        self.current = Some(slot);
    }

    pub fn tcb(&self, slot: usize) -> &ThreadControlBlock {
        &self.tcbs[slot]
    }

    pub(crate) fn tcb_mut(&mut self, slot: usize) -> &mut ThreadControlBlock {
        &mut self.tcbs[slot]
    }

    /// Slot of the alive thread carrying `id`.
    pub fn slot_of(&self, id: ThreadId) -> Option<usize> {
        let slot = id.slot();
        let tcb = self.tcbs.get(slot)?;
        (tcb.alive && tcb.id == Some(id)).then_some(slot)
    }

    pub fn current_id(&self) -> Option<ThreadId> {
        self.current.and_then(|slot| self.tcbs[slot].id)
    }

    /// First alive slot in pool order.
    pub fn first_alive(&self) -> Option<usize> {
        self.tcbs.iter().position(|tcb| tcb.alive)
    }

    /// Where a scheduling or wake-up scan begins: just past the current thread.
    pub fn scan_start(&self) -> Option<usize> {
        match self.current {
            Some(current) if self.tcbs[self.tcbs[current].next].alive => {
                Some(self.tcbs[current].next)
            }
            _ => self.first_alive(),
        }
    }

    /// Walk the alive list from `start`, visiting every alive record once.
    pub fn iter_from(&self, start: usize) -> AliveIter<'_> {
        AliveIter {
            table: self,
            next: start,
            remaining: if self.tcbs[start].alive { self.alive } else { 0 },
        }
    }

    /// Pick a dead slot for a new thread.
    ///
    /// The current slot is never handed out: a thread that just killed itself
    /// still runs on its stack until the pending switch happens.
    pub fn free_slot(&self) -> Result<usize, SpawnError> {
        if self.alive >= MAX_THREADS {
            return Err(SpawnError::ThreadLimitReached);
        }

        let mut in_flight = false;
        for (slot, tcb) in self.tcbs.iter().enumerate() {
            if tcb.alive {
                continue;
            }
            if self.current == Some(slot) {
                in_flight = true;
                continue;
            }
            return Ok(slot);
        }

        if in_flight {
            Err(SpawnError::ThreadLimitReached)
        } else {
            Err(SpawnError::ThreadsIncorrectlyAlive)
        }
    }

    /// Fill the dead record at `slot` and link it into the alive list.
    pub(crate) fn insert(&mut self, slot: usize, sp: usize, priority: u8, name: &str) -> ThreadId {
        let id = ThreadId::new(self.generation, slot);
        self.generation += 1;

        self.link(slot);
        let tcb = &mut self.tcbs[slot];
        tcb.sp = sp;
        tcb.alive = true;
        tcb.priority = priority;
        tcb.asleep = false;
        tcb.wake_tick = 0;
        tcb.blocked_on = None;
        tcb.id = Some(id);
        tcb.name = truncate_name(name);
        self.alive += 1;
        id
    }

    /// Mark the record dead and unlink it.
    ///
    /// Returns the semaphore the thread was blocked on, if any.
    pub(crate) fn remove(&mut self, slot: usize) -> Option<&'static Semaphore> {
        let (prev, next) = (self.tcbs[slot].prev, self.tcbs[slot].next);
        self.tcbs[prev].next = next;
        self.tcbs[next].prev = prev;

        let tcb = &mut self.tcbs[slot];
        tcb.alive = false;
        tcb.asleep = false;
        self.alive -= 1;
        tcb.blocked_on.take()
    }

    /// Insert before the current thread, or at the tail of the list before launch.
    fn link(&mut self, slot: usize) {
        let anchor = match self.current {
            Some(current) if self.tcbs[current].alive => Some(current),
            _ => self.first_alive(),
        };

        match anchor {
            None => {
                self.tcbs[slot].next = slot;
                self.tcbs[slot].prev = slot;
            }
            Some(anchor) => {
                let prev = self.tcbs[anchor].prev;
                self.tcbs[slot].next = anchor;
                self.tcbs[slot].prev = prev;
                self.tcbs[prev].next = slot;
                self.tcbs[anchor].prev = slot;
            }
        }
    }

    /// Clear the sleeping flag of every thread whose wake tick has come.
    pub(crate) fn wake_sleepers(&mut self, now: u64) -> usize {
        let mut woken = 0;
        for tcb in self.tcbs.iter_mut() {
            if tcb.alive && tcb.asleep && tcb.wake_tick <= now {
                tcb.asleep = false;
                woken += 1;
            }
        }
        woken
    }

    /// Release the first thread blocked on `sem`, scanning from just past the current thread.
    pub(crate) fn release_waiter(&mut self, sem: &Semaphore) -> Option<ThreadId> {
        let start = self.scan_start()?;
        let slot = self.iter_from(start).find(|&slot| {
            self.tcbs[slot]
                .blocked_on
                .map_or(false, |blocked| blocked.same(sem))
        })?;
        self.tcbs[slot].unblock();
        self.tcbs[slot].id
    }

    pub fn info(&self, slot: usize) -> Option<ThreadInfo> {
        let tcb = &self.tcbs[slot];
        let state = if !tcb.alive {
            ThreadState::Dead
        } else if tcb.blocked_on.is_some() {
            ThreadState::Blocked
        } else if tcb.asleep {
            ThreadState::Sleeping
        } else if self.current == Some(slot) {
            ThreadState::Running
        } else {
            ThreadState::Ready
        };

        Some(ThreadInfo {
            id: tcb.id?,
            name: tcb.name.clone(),
            priority: tcb.priority,
            state,
        })
    }
}

/// Iterator over alive slots in list order.
pub struct AliveIter<'a> {
    table: &'a ThreadTable,
    next: usize,
    remaining: usize,
}

impl Iterator for AliveIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.next;
        self.next = self.table.tcbs[slot].next;
        self.remaining -= 1;
        Some(slot)
    }
}
