//! Job-queue invoker that runs tools through the transport router.

use super::TransportRouter;
use crate::jobs::ports::{ToolInvocationError, ToolInvoker};
use crate::protocol::RpcOutcome;
use crate::tool_registry::domain::ToolServerId;
use crate::tool_registry::ports::ToolServerCatalog;
use async_trait::async_trait;
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;

/// Resolves the server from the catalog and calls the tool through the
/// router.
pub struct RoutedToolInvoker<K, C>
where
    K: ToolServerCatalog,
    C: Clock + Send + Sync,
{
    catalog: Arc<K>,
    router: Arc<TransportRouter<C>>,
}

impl<K, C> RoutedToolInvoker<K, C>
where
    K: ToolServerCatalog,
    C: Clock + Send + Sync,
{
    /// Creates an invoker.
    #[must_use]
    pub const fn new(catalog: Arc<K>, router: Arc<TransportRouter<C>>) -> Self {
        Self { catalog, router }
    }
}

#[async_trait]
impl<K, C> ToolInvoker for RoutedToolInvoker<K, C>
where
    K: ToolServerCatalog,
    C: Clock + Send + Sync,
{
    async fn invoke_tool(
        &self,
        server_id: &ToolServerId,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        let server = self
            .catalog
            .find_by_id(server_id)
            .await
            .map_err(|err| ToolInvocationError::new(err.to_string()))?
            .ok_or_else(|| ToolInvocationError::new(format!("unknown tool server: {server_id}")))?;

        let response = self
            .router
            .call_tool(&server, tool_name, arguments)
            .await
            .map_err(|err| ToolInvocationError::new(err.to_string()))?;

        match response.outcome() {
            RpcOutcome::Result(result) => Ok(result.clone()),
            RpcOutcome::Error(error) => Err(ToolInvocationError::new(format!(
                "tool {tool_name} failed with code {}: {}",
                error.code, error.message
            ))),
        }
    }
}
