//! Tick counting.

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

/// Monotonic system time.
///
/// Incremented once per timer interrupt; read from any context.
pub struct TickCounter {
    /// Number of ticks since launch
    ticks: AtomicU64,
    /// Tick frequency in Hz
    frequency: AtomicU32,
}

impl TickCounter {
    /// Create a new tick counter with the given frequency.
    ///
    /// # Arguments
    ///
    /// * `frequency` - Timer frequency in Hz
    pub const fn new(frequency: u32) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frequency: AtomicU32::new(frequency),
        }
    }

    /// Increment the tick counter and return the new time.
    ///
    /// This should only be called from the timer interrupt handler.
    pub fn increment(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Get the current tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Get the tick frequency in Hz.
    pub fn frequency(&self) -> u32 {
        self.frequency.load(Ordering::Acquire)
    }

    pub(crate) fn set_frequency(&self, frequency: u32) {
        self.frequency.store(frequency, Ordering::Release);
    }

    /// Convert ticks to milliseconds.
    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        ticks * 1_000 / u64::from(self.frequency().max(1))
    }

    /// Milliseconds since launch.
    pub fn uptime_ms(&self) -> u64 {
        self.ticks_to_ms(self.ticks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counter() {
        let counter = TickCounter::new(1000); // 1 kHz
        assert_eq!(counter.ticks(), 0);
        assert_eq!(counter.frequency(), 1000);

        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.ticks(), 1);
        assert_eq!(counter.uptime_ms(), 1);

        counter.set_frequency(100);
        assert_eq!(counter.ticks_to_ms(250), 2_500);
    }

    #[test]
    fn test_counter_runs_past_32_bits() {
        let counter = TickCounter::new(1000);
        counter.ticks.store(u64::from(u32::MAX), Ordering::Release);

        assert_eq!(counter.increment(), 1 << 32);
        assert_eq!(counter.ticks(), 1 << 32);
        assert_eq!(counter.uptime_ms(), 1 << 32);
    }
}
