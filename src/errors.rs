//! Error types for kernel operations.
//!
//! Every fallible kernel call returns one of the enums below. Each maps onto
//! the compact status codes applications forward over a serial line or
//! display (`code()`), with `0` reserved for success.

#![allow(clippy::uninlined_format_args)]

use core::fmt;

/// Result type for kernel operations that may fail in more than one way.
pub type KernelResult<T> = Result<T, KernelError>;

/// Status code reported for conditions without a dedicated code.
const UNKNOWN_FAILURE: i32 = -9;

/// Umbrella error for all kernel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Kernel initialization errors
    Init(InitError),
    /// Thread creation errors
    Spawn(SpawnError),
    /// Thread termination errors
    Kill(KillError),
    /// Periodic event registration errors
    Event(EventError),
    /// Aperiodic (interrupt) binding errors
    Bind(BindError),
    /// FIFO channel errors
    Fifo(FifoError),
    /// Launch errors
    Launch(LaunchError),
}

/// Errors returned by `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `init` was already called on this kernel
    AlreadyInitialized,
}

/// Errors returned by `add_thread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Kernel has not been initialized
    NotInitialized,
    /// Every thread record is alive
    ThreadLimitReached,
    /// The alive count says a record is free but none is dead
    ThreadsIncorrectlyAlive,
}

/// Errors returned by the kill family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillError {
    /// No alive thread carries this identifier
    ThreadDoesNotExist,
    /// The target is the only alive thread
    CannotKillLastThread,
    /// There is no current thread yet
    NotLaunched,
}

/// Errors returned by `add_periodic_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// Kernel has not been initialized
    NotInitialized,
    /// The periodic event pool is full
    PeriodicLimitReached,
    /// A period of zero ticks never fires
    ZeroPeriod,
}

/// Errors returned by `add_aperiodic_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// Kernel has not been initialized
    NotInitialized,
    /// Interrupt line outside the legal external range
    IrqInvalid(u16),
    /// Hardware priority would outrank the kernel's own interrupts
    HwiPriorityInvalid(u8),
}

/// Errors returned by the FIFO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoError {
    /// Channel index out of range
    BadChannel(usize),
}

/// Reasons `launch` came back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchError {
    /// Kernel has not been initialized
    NotInitialized,
    /// No thread was ever added
    NoThreadsScheduled,
    /// `launch` already ran
    AlreadyLaunched,
    /// The first context transfer returned
    DispatchReturned,
}

impl KernelError {
    /// Numeric status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            KernelError::Init(e) => e.code(),
            KernelError::Spawn(e) => e.code(),
            KernelError::Kill(e) => e.code(),
            KernelError::Event(e) => e.code(),
            KernelError::Bind(e) => e.code(),
            KernelError::Fifo(e) => e.code(),
            KernelError::Launch(e) => e.code(),
        }
    }
}

impl InitError {
    pub fn code(&self) -> i32 {
        UNKNOWN_FAILURE
    }
}

impl SpawnError {
    pub fn code(&self) -> i32 {
        match self {
            SpawnError::NotInitialized => UNKNOWN_FAILURE,
            SpawnError::ThreadLimitReached => -1,
            SpawnError::ThreadsIncorrectlyAlive => -3,
        }
    }
}

impl KillError {
    pub fn code(&self) -> i32 {
        match self {
            KillError::ThreadDoesNotExist => -4,
            KillError::CannotKillLastThread => -5,
            KillError::NotLaunched => UNKNOWN_FAILURE,
        }
    }
}

impl EventError {
    pub fn code(&self) -> i32 {
        match self {
            EventError::PeriodicLimitReached => -8,
            EventError::NotInitialized | EventError::ZeroPeriod => UNKNOWN_FAILURE,
        }
    }
}

impl BindError {
    pub fn code(&self) -> i32 {
        match self {
            BindError::NotInitialized => UNKNOWN_FAILURE,
            BindError::IrqInvalid(_) => -6,
            BindError::HwiPriorityInvalid(_) => -7,
        }
    }
}

impl FifoError {
    /// FIFO codes live in their own space, separate from scheduler codes.
    pub fn code(&self) -> i32 {
        -1
    }
}

impl LaunchError {
    pub fn code(&self) -> i32 {
        match self {
            LaunchError::NoThreadsScheduled => -2,
            _ => UNKNOWN_FAILURE,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Init(e) => write!(f, "Init error: {}", e),
            KernelError::Spawn(e) => write!(f, "Thread add error: {}", e),
            KernelError::Kill(e) => write!(f, "Thread kill error: {}", e),
            KernelError::Event(e) => write!(f, "Periodic event error: {}", e),
            KernelError::Bind(e) => write!(f, "Aperiodic event error: {}", e),
            KernelError::Fifo(e) => write!(f, "FIFO error: {}", e),
            KernelError::Launch(e) => write!(f, "Launch error: {}", e),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::AlreadyInitialized => write!(f, "Kernel already initialized"),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::NotInitialized => write!(f, "Kernel not initialized"),
            SpawnError::ThreadLimitReached => write!(f, "Maximum number of threads reached"),
            SpawnError::ThreadsIncorrectlyAlive => {
                write!(f, "Thread count has room but every record is alive")
            }
        }
    }
}

impl fmt::Display for KillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillError::ThreadDoesNotExist => write!(f, "Thread does not exist"),
            KillError::CannotKillLastThread => write!(f, "Cannot kill the last alive thread"),
            KillError::NotLaunched => write!(f, "Kernel has no current thread"),
        }
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::NotInitialized => write!(f, "Kernel not initialized"),
            EventError::PeriodicLimitReached => write!(f, "Maximum number of periodic events reached"),
            EventError::ZeroPeriod => write!(f, "Period must be at least one tick"),
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::NotInitialized => write!(f, "Kernel not initialized"),
            BindError::IrqInvalid(irq) => write!(f, "Invalid interrupt number: {}", irq),
            BindError::HwiPriorityInvalid(prio) => write!(f, "Invalid hardware priority: {}", prio),
        }
    }
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoError::BadChannel(index) => write!(f, "Invalid FIFO channel: {}", index),
        }
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::NotInitialized => write!(f, "Kernel not initialized"),
            LaunchError::NoThreadsScheduled => write!(f, "No threads scheduled"),
            LaunchError::AlreadyLaunched => write!(f, "Kernel already launched"),
            LaunchError::DispatchReturned => write!(f, "First context switch returned"),
        }
    }
}

impl From<InitError> for KernelError {
    fn from(error: InitError) -> Self {
        KernelError::Init(error)
    }
}

impl From<SpawnError> for KernelError {
    fn from(error: SpawnError) -> Self {
        KernelError::Spawn(error)
    }
}

impl From<KillError> for KernelError {
    fn from(error: KillError) -> Self {
        KernelError::Kill(error)
    }
}

impl From<EventError> for KernelError {
    fn from(error: EventError) -> Self {
        KernelError::Event(error)
    }
}

impl From<BindError> for KernelError {
    fn from(error: BindError) -> Self {
        KernelError::Bind(error)
    }
}

impl From<FifoError> for KernelError {
    fn from(error: FifoError) -> Self {
        KernelError::Fifo(error)
    }
}

impl From<LaunchError> for KernelError {
    fn from(error: LaunchError) -> Self {
        KernelError::Launch(error)
    }
}
