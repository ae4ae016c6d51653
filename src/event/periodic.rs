//! Fixed pool of tick-driven periodic handlers.

use super::EventHandler;
use crate::config::MAX_PERIODIC_EVENTS;
use crate::errors::EventError;

/// Handlers due at one tick, collected so they can run outside the kernel lock.
pub type DueHandlers = heapless::Vec<EventHandler, MAX_PERIODIC_EVENTS>;

/// One registered periodic handler.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicEvent {
    handler: EventHandler,
    /// Period in ticks
    period: u32,
    /// Absolute tick of the next execution
    next_tick: u64,
}

impl PeriodicEvent {
    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }
}

/// Registered periodic events, in registration order. Events are never removed.
pub struct PeriodicEvents {
    events: heapless::Vec<PeriodicEvent, MAX_PERIODIC_EVENTS>,
}

impl Default for PeriodicEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicEvents {
    pub const fn new() -> Self {
        Self {
            events: heapless::Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodicEvent> {
        self.events.iter()
    }

    /// Register `handler` to first run at `now + period`.
    pub(crate) fn add(&mut self, handler: EventHandler, period: u32, now: u64) -> Result<(), EventError> {
        if period == 0 {
            return Err(EventError::ZeroPeriod);
        }
        self.events
            .push(PeriodicEvent {
                handler,
                period,
                next_tick: now + u64::from(period),
            })
            .map_err(|_| EventError::PeriodicLimitReached)
    }

    /// Take every handler due at `now` and reschedule it one period later.
    pub(crate) fn collect_due(&mut self, now: u64) -> DueHandlers {
        let mut due = DueHandlers::new();
        for event in self.events.iter_mut().filter(|e| e.next_tick == now) {
            event.next_tick = now + u64::from(event.period);
            // Capacities match, so this cannot overflow.
            let _ = due.push(event.handler);
        }
        due
    }
}
