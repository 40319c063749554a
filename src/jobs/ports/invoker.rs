//! Port through which queued jobs reach their tool server.

use crate::tool_registry::domain::ToolServerId;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Runs one `tools/call` against a server.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invokes `tool_name` with `arguments` and returns the tool result.
    ///
    /// # Errors
    ///
    /// Returns [`ToolInvocationError`] when the call fails at any layer,
    /// including an error response from the server.
    async fn invoke_tool(
        &self,
        server_id: &ToolServerId,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError>;
}

/// Invocation failure recorded on the job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolInvocationError {
    message: String,
}

impl ToolInvocationError {
    /// Creates an invocation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
