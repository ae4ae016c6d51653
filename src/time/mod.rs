//! Tick-based kernel time.
//!
//! The kernel's unit of time is one tick of the system timer. Everything
//! user-facing (sleep durations) is given in milliseconds and converted with
//! the configured tick rate.

pub mod tick;

pub use tick::TickCounter;

/// Default tick rate (1 ms per tick).
pub const TIMER_FREQUENCY_HZ: u32 = 1_000;

/// Convert milliseconds to ticks at `tick_hz`, rounding up.
///
/// A non-zero duration always lasts at least one tick.
pub fn ms_to_ticks(ms: u32, tick_hz: u32) -> u64 {
    let ticks = (u64::from(ms) * u64::from(tick_hz) + 999) / 1_000;
    if ms > 0 {
        ticks.max(1)
    } else {
        0
    }
}
