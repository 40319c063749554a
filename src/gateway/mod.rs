//! Composition layer: one entry point over drivers, cache, limiter and jobs.
//!
//! [`TransportRouter`] picks the driver for a server's transport and serves
//! discovery through the schema cache. [`ToolGateway`] adds the catalog, the
//! per-server rate limit, the job queue for long-running servers and the
//! aggregate tool overview.

mod assembly;
mod error;
mod invoker;
mod overview;
mod router;
mod service;

pub use assembly::{GatewayStack, InMemoryToolGateway};
pub use error::{GatewayError, GatewayErrorKind, GatewayResult};
pub use invoker::RoutedToolInvoker;
pub use overview::{ServerOverview, ToolOverview};
pub use router::{TransportDrivers, TransportRouter};
pub use service::{ToolCallOutcome, ToolGateway};

#[cfg(test)]
mod tests;
