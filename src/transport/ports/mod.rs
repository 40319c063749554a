//! Port contracts for transport drivers.

mod driver;

pub use driver::TransportDriver;
