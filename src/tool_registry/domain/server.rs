//! Tool server configuration aggregate.

use super::{ToolRegistryDomainError, ToolServerId, ToolTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// How invocations against a server are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Invocations run inline and the caller waits for the response.
    #[default]
    Interactive,
    /// Invocations are always routed through the job queue.
    LongRunning,
}

impl ExecutionMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::LongRunning => "long_running",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Configuration of one tool server.
///
/// A configuration is immutable once a session has been opened against it;
/// replacing it goes through the gateway so sessions and caches are reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerConfig {
    id: ToolServerId,
    name: String,
    transport: ToolTransport,
    execution: ExecutionMode,
    rate_limit_per_minute: Option<NonZeroU32>,
}

impl ToolServerConfig {
    /// Creates a configuration without a rate limit.
    ///
    /// Persistent automation servers start out long-running; every other
    /// transport starts out interactive.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyServerName`] when `name` is
    /// blank.
    pub fn new(
        id: ToolServerId,
        name: impl Into<String>,
        transport: ToolTransport,
    ) -> Result<Self, ToolRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyServerName);
        }

        let execution = if transport.is_persistent_automation() {
            ExecutionMode::LongRunning
        } else {
            ExecutionMode::Interactive
        };
        Ok(Self {
            id,
            name: normalized_name,
            transport,
            execution,
            rate_limit_per_minute: None,
        })
    }

    /// Sets the execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InteractiveAutomationServer`] when
    /// a persistent automation server is made interactive.
    pub fn with_execution(mut self, execution: ExecutionMode) -> Result<Self, ToolRegistryDomainError> {
        if execution == ExecutionMode::Interactive && self.transport.is_persistent_automation() {
            return Err(ToolRegistryDomainError::InteractiveAutomationServer);
        }
        self.execution = execution;
        Ok(self)
    }

    /// Sets a per-minute, per-caller rate limit.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::ZeroRateLimit`] for a limit of zero.
    pub fn with_rate_limit_per_minute(mut self, limit: u32) -> Result<Self, ToolRegistryDomainError> {
        self.rate_limit_per_minute =
            Some(NonZeroU32::new(limit).ok_or(ToolRegistryDomainError::ZeroRateLimit)?);
        Ok(self)
    }

    /// Returns the server identity.
    #[must_use]
    pub const fn id(&self) -> &ToolServerId {
        &self.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transport settings.
    #[must_use]
    pub const fn transport(&self) -> &ToolTransport {
        &self.transport
    }

    /// Returns the execution mode.
    ///
    /// Persistent automation servers report `LongRunning` even when a
    /// deserialized configuration says otherwise.
    #[must_use]
    pub const fn execution(&self) -> ExecutionMode {
        if self.transport.is_persistent_automation() {
            ExecutionMode::LongRunning
        } else {
            self.execution
        }
    }

    /// Returns the per-minute limit, if any.
    #[must_use]
    pub const fn rate_limit_per_minute(&self) -> Option<NonZeroU32> {
        self.rate_limit_per_minute
    }
}
