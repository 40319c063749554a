//! Structural suppression of individual tools.

use crate::tool_registry::domain::{ToolDescriptor, ToolServerId};
use std::collections::{HashMap, HashSet};

/// Set of `(server, tool)` pairs hidden from discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolDenyList {
    denied: HashMap<ToolServerId, HashSet<String>>,
}

impl ToolDenyList {
    /// Creates an empty deny-list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides `tool_name` on `server_id`.
    #[must_use]
    pub fn deny(mut self, server_id: ToolServerId, tool_name: impl Into<String>) -> Self {
        self.denied.entry(server_id).or_default().insert(tool_name.into());
        self
    }

    /// Returns whether the tool is hidden.
    #[must_use]
    pub fn is_denied(&self, server_id: &ToolServerId, tool_name: &str) -> bool {
        self.denied
            .get(server_id)
            .is_some_and(|tools| tools.contains(tool_name))
    }

    /// Returns the tools that are not hidden, preserving order.
    #[must_use]
    pub fn filter(&self, server_id: &ToolServerId, tools: &[ToolDescriptor]) -> Vec<ToolDescriptor> {
        tools
            .iter()
            .filter(|tool| !self.is_denied(server_id, tool.name()))
            .cloned()
            .collect()
    }
}

impl FromIterator<(ToolServerId, String)> for ToolDenyList {
    fn from_iter<I: IntoIterator<Item = (ToolServerId, String)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |list, (server_id, tool)| list.deny(server_id, tool))
    }
}
