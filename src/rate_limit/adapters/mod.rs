//! Adapter implementations for rate window storage.

pub mod memory;
