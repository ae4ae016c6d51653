//! Inter-thread communication channels.

pub mod fifo;

pub use fifo::{Fifo, FifoStatus};
