//! Synchronization primitives built on interrupt masking.

pub mod critical;
pub mod semaphore;

pub use critical::CriticalSection;
pub use semaphore::Semaphore;
