//! Persistent automation sessions that reset themselves on lock contention.

use super::registry::SessionRegistry;
use crate::protocol::{RpcEnvelope, RpcResponse};
use crate::session::domain::SessionError;
use crate::session::ports::ProcessLauncher;
use crate::tool_registry::domain::{ProcessTransportConfig, ToolServerId};
use std::sync::Arc;
use tracing::warn;

/// Signatures reported by browser automation engines whose profile or
/// target is held by another process.
const DEFAULT_SIGNATURES: [&str; 6] = [
    "browser is already in use",
    "SingletonLock",
    "user data directory is already in use",
    "Target page, context or browser has been closed",
    "Browser has been closed",
    "Target closed",
];

/// Case-insensitive set of lock-contention signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSignatures {
    lowered: Vec<String>,
}

impl LockSignatures {
    /// Creates a signature set. Blank entries are ignored.
    pub fn new(signatures: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let lowered = signatures
            .into_iter()
            .map(|signature| signature.as_ref().trim().to_lowercase())
            .filter(|signature| !signature.is_empty())
            .collect();
        Self { lowered }
    }

    /// Returns the first signature contained in `text`.
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.lowered
            .iter()
            .find(|signature| haystack.contains(signature.as_str()))
            .map(String::as_str)
    }
}

impl Default for LockSignatures {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURES)
    }
}

/// Sends calls through a persistent automation session and retires the
/// session when a response shows lock contention.
pub struct AutomationSessionSupervisor<L>
where
    L: ProcessLauncher,
{
    registry: Arc<SessionRegistry<L>>,
    signatures: LockSignatures,
}

impl<L> AutomationSessionSupervisor<L>
where
    L: ProcessLauncher + 'static,
{
    /// Creates a supervisor over a shared registry.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry<L>>, signatures: LockSignatures) -> Self {
        Self {
            registry,
            signatures,
        }
    }

    /// Sends a request and inspects the response.
    ///
    /// On detection the session is retired in the background while the
    /// identity's slot stays held, and the response is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] from the underlying session.
    pub async fn call(
        &self,
        server_id: &ToolServerId,
        config: &ProcessTransportConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, SessionError> {
        let response = self.registry.call(server_id, config, envelope).await?;

        if let Some(signature) = self.signatures.detect(&response.searchable_text()) {
            warn!(
                server_id = %server_id,
                signature,
                "lock contention detected, resetting automation session"
            );
            drop(self.registry.retire(server_id).await);
        }

        Ok(response)
    }
}

impl<L> std::fmt::Debug for AutomationSessionSupervisor<L>
where
    L: ProcessLauncher,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AutomationSessionSupervisor")
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}
