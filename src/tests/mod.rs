//! Crate-level tests driving the kernel through a recording port.

mod helpers;
mod integration;
