//! Asynchronous job queue for long-running tool invocations.
//!
//! Callers receive a job identifier immediately and poll for the outcome.
//! Execution happens out of band on a worker that reacts to job signals.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
