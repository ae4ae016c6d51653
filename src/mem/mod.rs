//! Memory for thread stacks.
//!
//! Everything is statically sized; the kernel never allocates.

pub mod stack_pool;

pub use stack_pool::{Stack, StackPool, STACK_CANARY};
