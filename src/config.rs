//! Kernel limits and board configuration.
//!
//! Pool sizes are compile-time constants so every kernel structure is a
//! fixed array. Everything that depends on the board (clock, interrupt
//! priorities, legal interrupt lines) lives in [`KernelConfig`] and is handed
//! to [`Kernel::init`](crate::Kernel::init).

/// Maximum number of thread records in the registry.
pub const MAX_THREADS: usize = 6;

/// Maximum number of periodic events.
pub const MAX_PERIODIC_EVENTS: usize = 6;

/// Size of each thread stack, in 32-bit words.
pub const STACK_WORDS: usize = 1024;

/// Longest debug name kept for a thread, in bytes.
pub const MAX_NAME_LENGTH: usize = 16;

/// Number of elements each kernel FIFO channel holds.
pub const FIFO_CAPACITY: usize = 16;

/// Number of kernel FIFO channels.
pub const MAX_FIFOS: usize = 4;

/// Board-level configuration consumed by `init` and `launch`.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Core clock feeding the tick timer, in Hz
    pub core_clock_hz: u32,
    /// Tick frequency in Hz
    pub tick_hz: u32,
    /// Hardware priority of the tick interrupt
    pub tick_priority: u8,
    /// Hardware priority of the context-switch interrupt
    pub switch_priority: u8,
    /// Number of implemented NVIC priority bits
    pub priority_bits: u8,
    /// Lowest external interrupt line accepted by `add_aperiodic_event`
    pub irq_min: u16,
    /// Highest external interrupt line accepted by `add_aperiodic_event`
    pub irq_max: u16,
    /// Largest (least urgent) priority an aperiodic handler may use
    pub max_irq_priority: u8,
    /// One-time board bring-up, run by `init` before the port is configured
    pub board_init: Option<fn()>,
}

impl KernelConfig {
    /// 48 MHz core, 1 kHz tick, MSP432 interrupt layout.
    pub const DEFAULT: Self = Self {
        core_clock_hz: 48_000_000,
        tick_hz: 1_000,
        tick_priority: 3,
        switch_priority: 7,
        priority_bits: 3,
        irq_min: 0,
        irq_max: 40,
        max_irq_priority: 6,
        board_init: None,
    };

    /// Start building a configuration from the defaults.
    pub const fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder {
            config: Self::DEFAULT,
        }
    }

    /// Whether `irq` is a line aperiodic handlers may be bound to.
    pub fn irq_is_valid(&self, irq: u16) -> bool {
        (self.irq_min..=self.irq_max).contains(&irq)
    }

    /// Whether `priority` is usable by an aperiodic handler.
    pub fn irq_priority_is_valid(&self, priority: u8) -> bool {
        priority <= self.max_irq_priority
    }

    /// Timer reload value for one tick.
    pub fn tick_reload(&self) -> u32 {
        (self.core_clock_hz / self.tick_hz.max(1)).saturating_sub(1)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for [`KernelConfig`].
#[derive(Debug, Clone, Copy)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    pub const fn core_clock_hz(mut self, hz: u32) -> Self {
        self.config.core_clock_hz = hz;
        self
    }

    pub const fn tick_hz(mut self, hz: u32) -> Self {
        self.config.tick_hz = hz;
        self
    }

    pub const fn tick_priority(mut self, priority: u8) -> Self {
        self.config.tick_priority = priority;
        self
    }

    pub const fn switch_priority(mut self, priority: u8) -> Self {
        self.config.switch_priority = priority;
        self
    }

    pub const fn priority_bits(mut self, bits: u8) -> Self {
        self.config.priority_bits = bits;
        self
    }

    /// Legal external interrupt lines, inclusive on both ends.
    pub const fn irq_range(mut self, min: u16, max: u16) -> Self {
        self.config.irq_min = min;
        self.config.irq_max = max;
        self
    }

    pub const fn max_irq_priority(mut self, priority: u8) -> Self {
        self.config.max_irq_priority = priority;
        self
    }

    pub const fn board_init(mut self, hook: fn()) -> Self {
        self.config.board_init = Some(hook);
        self
    }

    pub const fn build(self) -> KernelConfig {
        self.config
    }
}
