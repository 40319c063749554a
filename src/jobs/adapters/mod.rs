//! Adapter implementations for the job queue ports.

mod channel;
pub mod memory;

pub use channel::ChannelJobSignal;
