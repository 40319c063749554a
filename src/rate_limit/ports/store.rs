//! Rate window storage port.

use crate::tool_registry::domain::{CallerId, ToolServerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for rate window store operations.
pub type RateWindowStoreResult<T> = Result<T, RateWindowStoreError>;

/// Atomic counter storage for rate windows.
#[async_trait]
pub trait RateWindowStore: Send + Sync {
    /// Atomically counts one invocation in the window starting at
    /// `window_start`, creating it with a count of one when absent, and
    /// returns the post-increment count.
    async fn increment(
        &self,
        server_id: &ToolServerId,
        caller_id: &CallerId,
        window_start: DateTime<Utc>,
    ) -> RateWindowStoreResult<u32>;
}

/// Errors returned by rate window stores.
#[derive(Debug, Clone, Error)]
pub enum RateWindowStoreError {
    /// Persistence-layer failure.
    #[error("rate window persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RateWindowStoreError {
    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
