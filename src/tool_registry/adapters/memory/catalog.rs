//! In-memory catalog of tool server configurations.

use crate::tool_registry::{
    domain::{ToolServerConfig, ToolServerId},
    ports::{ToolServerCatalog, ToolServerCatalogError, ToolServerCatalogResult},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory tool server catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryToolServerCatalog {
    servers: Arc<RwLock<BTreeMap<ToolServerId, ToolServerConfig>>>,
}

impl InMemoryToolServerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with configurations.
    ///
    /// Later entries replace earlier ones with the same identity.
    #[must_use]
    pub fn with_servers(servers: impl IntoIterator<Item = ToolServerConfig>) -> Self {
        let map = servers
            .into_iter()
            .map(|server| (server.id().clone(), server))
            .collect();
        Self {
            servers: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl ToolServerCatalog for InMemoryToolServerCatalog {
    async fn register(&self, server: &ToolServerConfig) -> ToolServerCatalogResult<()> {
        let mut servers = self.servers.write().map_err(|err| {
            ToolServerCatalogError::persistence(std::io::Error::other(err.to_string()))
        })?;

        if servers.contains_key(server.id()) {
            return Err(ToolServerCatalogError::DuplicateServer(server.id().clone()));
        }

        servers.insert(server.id().clone(), server.clone());
        Ok(())
    }

    async fn update(&self, server: &ToolServerConfig) -> ToolServerCatalogResult<()> {
        let mut servers = self.servers.write().map_err(|err| {
            ToolServerCatalogError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let stored = servers
            .get_mut(server.id())
            .ok_or_else(|| ToolServerCatalogError::NotFound(server.id().clone()))?;
        *stored = server.clone();
        Ok(())
    }

    async fn find_by_id(
        &self,
        server_id: &ToolServerId,
    ) -> ToolServerCatalogResult<Option<ToolServerConfig>> {
        let servers = self.servers.read().map_err(|err| {
            ToolServerCatalogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(servers.get(server_id).cloned())
    }

    async fn list_all(&self) -> ToolServerCatalogResult<Vec<ToolServerConfig>> {
        let servers = self.servers.read().map_err(|err| {
            ToolServerCatalogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(servers.values().cloned().collect())
    }
}
