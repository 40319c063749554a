//! Domain model for tool server configuration and discovery.
//!
//! The tool registry domain models tool server identity, transport
//! configuration, health reports, and discovered tool metadata.
//! Infrastructure concerns remain outside this boundary.

mod error;
mod health;
mod ids;
mod server;
mod tool;
mod transport;

pub use error::ToolRegistryDomainError;
pub use health::{ToolServerHealth, ToolServerHealthStatus};
pub use ids::{CallerId, ToolServerId};
pub use server::{ExecutionMode, ToolServerConfig};
pub use tool::{ToolDescriptor, ToolList};
pub use transport::{
    HttpStreamTransportConfig, NonJsonLinePolicy, ProcessSessionMode, ProcessTransportConfig,
    RestTransportConfig, ToolTransport, TransportKind,
};
