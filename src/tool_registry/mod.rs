//! Tool server configuration registry.
//!
//! Holds validated server identities, transport settings and discovered tool
//! metadata, plus the catalog port through which the gateway looks servers
//! up:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
