//! Fixed one-minute rate windows per (server, caller).
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The limiter in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
