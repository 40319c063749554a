//! Transport selection and cached discovery.

use crate::protocol::{RpcEnvelope, RpcResponse, methods};
use crate::schema_cache::ToolSchemaCache;
use crate::tool_registry::domain::{
    ToolDescriptor, ToolList, ToolServerConfig, ToolServerHealth, ToolServerId, TransportKind,
};
use crate::transport::{TransportError, ports::TransportDriver};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One driver per transport kind.
#[derive(Clone)]
pub struct TransportDrivers {
    /// Driver for subprocess servers.
    pub process: Arc<dyn TransportDriver>,
    /// Driver for HTTP stream servers.
    pub http_stream: Arc<dyn TransportDriver>,
    /// Driver for REST servers.
    pub rest: Arc<dyn TransportDriver>,
}

impl TransportDrivers {
    fn select(&self, kind: TransportKind) -> &dyn TransportDriver {
        match kind {
            TransportKind::Process => self.process.as_ref(),
            TransportKind::HttpStream => self.http_stream.as_ref(),
            TransportKind::Rest => self.rest.as_ref(),
        }
    }

    fn all(&self) -> [&dyn TransportDriver; 3] {
        [
            self.process.as_ref(),
            self.http_stream.as_ref(),
            self.rest.as_ref(),
        ]
    }
}

/// Builds envelopes, routes them by transport kind and serves discovery
/// through the schema cache.
pub struct TransportRouter<C>
where
    C: Clock + Send + Sync,
{
    drivers: TransportDrivers,
    cache: Arc<ToolSchemaCache<C>>,
    clock: Arc<C>,
}

impl<C> TransportRouter<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a router.
    #[must_use]
    pub const fn new(drivers: TransportDrivers, cache: Arc<ToolSchemaCache<C>>, clock: Arc<C>) -> Self {
        Self {
            drivers,
            cache,
            clock,
        }
    }

    /// Returns the discovery cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ToolSchemaCache<C>> {
        &self.cache
    }

    /// Sends `method` with `params` under a fresh request id.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails. A JSON-RPC error
    /// response is a successful delivery and comes back as an
    /// [`RpcResponse`].
    pub async fn invoke(
        &self,
        server: &ToolServerConfig,
        method: &str,
        params: Value,
    ) -> Result<RpcResponse, TransportError> {
        self.dispatch(server, RpcEnvelope::new(method, params)).await
    }

    /// Invokes a tool with `tools/call`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails.
    pub async fn call_tool(
        &self,
        server: &ToolServerConfig,
        name: &str,
        arguments: Value,
    ) -> Result<RpcResponse, TransportError> {
        self.dispatch(server, RpcEnvelope::tools_call(name, arguments))
            .await
    }

    /// Returns the server's tools, from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when discovery fails or the tool list is
    /// unusable.
    pub async fn discover_tools(
        &self,
        server: &ToolServerConfig,
    ) -> Result<Vec<ToolDescriptor>, TransportError> {
        if let Some(tools) = self.cache.get(server.id()) {
            debug!(server_id = %server.id(), count = tools.len(), "tool list served from cache");
            return Ok(tools);
        }
        self.refresh_tools(server).await
    }

    /// Checks whether a server answers.
    ///
    /// Uses the driver's dedicated probe when it has one; otherwise a fresh
    /// discovery round decides.
    pub async fn health_check(&self, server: &ToolServerConfig) -> ToolServerHealth {
        let driver = self.drivers.select(server.transport().kind());
        let outcome = match driver.probe(server).await {
            Some(probed) => probed,
            None => self.refresh_tools(server).await.map(drop),
        };
        let checked_at = self.clock.utc();
        match outcome {
            Ok(()) => ToolServerHealth::healthy(checked_at),
            Err(err) => {
                debug!(server_id = %server.id(), error = %err, "health check failed");
                ToolServerHealth::unhealthy(checked_at, err.to_string())
            }
        }
    }

    /// Drops cached tools and per-server connection state.
    pub async fn forget(&self, server_id: &ToolServerId) {
        self.cache.invalidate(Some(server_id));
        for driver in self.drivers.all() {
            driver.forget(server_id).await;
        }
    }

    /// Releases every driver's resources.
    pub async fn shutdown(&self) {
        for driver in self.drivers.all() {
            driver.shutdown().await;
        }
    }

    async fn refresh_tools(
        &self,
        server: &ToolServerConfig,
    ) -> Result<Vec<ToolDescriptor>, TransportError> {
        let response = self.dispatch(server, RpcEnvelope::tools_list()).await?;
        let result = response
            .into_result()
            .map_err(|error| TransportError::Remote {
                server_id: server.id().clone(),
                method: methods::TOOLS_LIST.to_owned(),
                error,
            })?;
        let list =
            ToolList::from_result(&result).map_err(|source| TransportError::MalformedToolList {
                server_id: server.id().clone(),
                source,
            })?;
        if list.skipped() > 0 {
            warn!(
                server_id = %server.id(),
                skipped = list.skipped(),
                "tool list entries without a name were skipped"
            );
        }

        let tools = list.into_tools();
        let visible = self.cache.deny_list().filter(server.id(), &tools);
        self.cache.put(server.id(), tools);
        Ok(visible)
    }

    async fn dispatch(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError> {
        let kind = server.transport().kind();
        debug!(
            server_id = %server.id(),
            request_id = %envelope.id(),
            method = envelope.method(),
            transport = kind.as_str(),
            "routing request"
        );
        self.drivers.select(kind).send(server, envelope).await
    }
}

impl<C> std::fmt::Debug for TransportRouter<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TransportRouter")
            .field("cached_servers", &self.cache.len())
            .finish_non_exhaustive()
    }
}
