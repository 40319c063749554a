//! Aggregate view of every registered server and its tools.

use crate::tool_registry::domain::{ToolDescriptor, ToolServerHealth, ToolServerId, TransportKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One server's entry in the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerOverview {
    /// Server identity.
    pub server_id: ToolServerId,
    /// Human-readable name.
    pub name: String,
    /// Configured transport.
    pub transport: TransportKind,
    /// Health at collection time.
    pub health: ToolServerHealth,
    /// Visible tools; empty when discovery failed.
    pub tools: Vec<ToolDescriptor>,
}

/// Every registered server with its tools, collected at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOverview {
    /// When the overview was collected.
    pub generated_at: DateTime<Utc>,
    /// Entries ordered by server identity.
    pub servers: Vec<ServerOverview>,
}

impl ToolOverview {
    /// Returns the total number of visible tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.servers.iter().map(|server| server.tools.len()).sum()
    }

    /// Returns the entry for one server.
    #[must_use]
    pub fn server(&self, server_id: &ToolServerId) -> Option<&ServerOverview> {
        self.servers
            .iter()
            .find(|entry| &entry.server_id == server_id)
    }
}
