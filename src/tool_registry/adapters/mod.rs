//! Adapter implementations for tool registry ports.

pub mod memory;
