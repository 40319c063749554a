//! Transport driver port.

use crate::protocol::{RpcEnvelope, RpcResponse};
use crate::tool_registry::domain::{ToolServerConfig, ToolServerId};
use crate::transport::TransportError;
use async_trait::async_trait;

/// Delivers envelopes to tool servers of one transport kind.
#[async_trait]
pub trait TransportDriver: Send + Sync {
    /// Sends a request and returns the correlated response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be delivered or
    /// answered.
    async fn send(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError>;

    /// Runs a dedicated health probe.
    ///
    /// Returns `None` when the transport has no probe, in which case health
    /// is inferred from discovery.
    async fn probe(&self, _server: &ToolServerConfig) -> Option<Result<(), TransportError>> {
        None
    }

    /// Drops per-server connection state after a configuration change.
    async fn forget(&self, _server_id: &ToolServerId) {}

    /// Releases every per-server resource the driver holds.
    async fn shutdown(&self) {}
}
