//! Catalog port for tool server configurations.

use crate::tool_registry::domain::{ToolServerConfig, ToolServerId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog operations.
pub type ToolServerCatalogResult<T> = Result<T, ToolServerCatalogError>;

/// Persistence contract for tool server configurations.
#[async_trait]
pub trait ToolServerCatalog: Send + Sync {
    /// Stores a new server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerCatalogError::DuplicateServer`] when the identity
    /// is already registered.
    async fn register(&self, server: &ToolServerConfig) -> ToolServerCatalogResult<()>;

    /// Replaces an existing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerCatalogError::NotFound`] when the server does not
    /// exist.
    async fn update(&self, server: &ToolServerConfig) -> ToolServerCatalogResult<()>;

    /// Finds a configuration by identity.
    async fn find_by_id(
        &self,
        server_id: &ToolServerId,
    ) -> ToolServerCatalogResult<Option<ToolServerConfig>>;

    /// Returns every configuration ordered by identity.
    async fn list_all(&self) -> ToolServerCatalogResult<Vec<ToolServerConfig>>;
}

/// Errors returned by catalog implementations.
#[derive(Debug, Clone, Error)]
pub enum ToolServerCatalogError {
    /// A server with the same identity already exists.
    #[error("duplicate tool server identifier: {0}")]
    DuplicateServer(ToolServerId),

    /// The server was not found.
    #[error("tool server not found: {0}")]
    NotFound(ToolServerId),

    /// Persistence-layer failure.
    #[error("catalog persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ToolServerCatalogError {
    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
