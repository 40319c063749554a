//! Driver for subprocess tool servers.

use crate::protocol::{RpcEnvelope, RpcResponse};
use crate::session::ports::ProcessLauncher;
use crate::session::services::{AutomationSessionSupervisor, LockSignatures, SessionRegistry};
use crate::tool_registry::domain::{
    ProcessSessionMode, ToolServerConfig, ToolServerId, ToolTransport, TransportKind,
};
use crate::transport::{TransportError, ports::TransportDriver};
use async_trait::async_trait;
use std::sync::Arc;

/// Routes envelopes through the session registry, using the automation
/// supervisor for servers in persistent automation mode.
pub struct ProcessDriver<L>
where
    L: ProcessLauncher,
{
    registry: Arc<SessionRegistry<L>>,
    automation: AutomationSessionSupervisor<L>,
}

impl<L> ProcessDriver<L>
where
    L: ProcessLauncher + 'static,
{
    /// Creates a driver over a shared session registry.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<L>>, signatures: LockSignatures) -> Self {
        Self {
            automation: AutomationSessionSupervisor::new(Arc::clone(&registry), signatures),
            registry,
        }
    }

    /// Returns the session registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry<L>> {
        &self.registry
    }
}

#[async_trait]
impl<L> TransportDriver for ProcessDriver<L>
where
    L: ProcessLauncher + 'static,
{
    async fn send(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError> {
        let ToolTransport::Process(config) = server.transport() else {
            return Err(TransportError::mismatch(
                server.id(),
                TransportKind::Process,
                server.transport().kind(),
            ));
        };

        let response = match config.session_mode() {
            ProcessSessionMode::Standard => self.registry.call(server.id(), config, envelope).await,
            ProcessSessionMode::PersistentAutomation => {
                self.automation.call(server.id(), config, envelope).await
            }
        }?;
        Ok(response)
    }

    async fn forget(&self, server_id: &ToolServerId) {
        self.registry.reset(server_id).await;
    }

    async fn shutdown(&self) {
        self.registry.shutdown_all().await;
    }
}

impl<L> std::fmt::Debug for ProcessDriver<L>
where
    L: ProcessLauncher,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProcessDriver")
            .field("automation", &self.automation)
            .finish_non_exhaustive()
    }
}
