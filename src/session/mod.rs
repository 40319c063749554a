//! Stdio session management for subprocess tool servers.
//!
//! Each tool server identity has zero or one live subprocess. A session is a
//! single-writer actor task that owns the process pipes, a FIFO queue of
//! pending calls and the single in-flight slot; callers reach it through a
//! command channel and receive replies on oneshot channels.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The actor, registry and automation supervisor in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
