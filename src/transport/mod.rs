//! Transport drivers that deliver envelopes to tool servers.
//!
//! The [`ports::TransportDriver`] contract is implemented once per transport
//! kind in [`adapters`]: subprocess sessions, HTTP with JSON or SSE bodies,
//! and REST endpoints with vendor response shapes.

pub mod adapters;
mod error;
pub mod ports;

pub use error::{FailureKind, TransportError};
