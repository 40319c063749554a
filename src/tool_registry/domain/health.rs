//! Tool server health domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of a tool server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolServerHealthStatus {
    /// Server answered discovery or its health probe.
    Healthy,
    /// Server could not be reached or answered with an error.
    Unhealthy,
}

impl ToolServerHealthStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for ToolServerHealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Timestamped health report for a tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerHealth {
    status: ToolServerHealthStatus,
    checked_at: DateTime<Utc>,
    message: Option<String>,
}

impl ToolServerHealth {
    /// Creates a health report.
    #[must_use]
    pub const fn new(status: ToolServerHealthStatus, checked_at: DateTime<Utc>) -> Self {
        Self {
            status,
            checked_at,
            message: None,
        }
    }

    /// Creates a `healthy` health report.
    #[must_use]
    pub const fn healthy(checked_at: DateTime<Utc>) -> Self {
        Self::new(ToolServerHealthStatus::Healthy, checked_at)
    }

    /// Creates an `unhealthy` health report carrying the failure text.
    #[must_use]
    pub fn unhealthy(checked_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self::new(ToolServerHealthStatus::Unhealthy, checked_at).with_message(message)
    }

    /// Adds an explanatory message. Blank messages are dropped.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let normalized = message.into().trim().to_owned();
        if !normalized.is_empty() {
            self.message = Some(normalized);
        }
        self
    }

    /// Returns the health status.
    #[must_use]
    pub const fn status(&self) -> ToolServerHealthStatus {
        self.status
    }

    /// Returns whether the server is healthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self.status, ToolServerHealthStatus::Healthy)
    }

    /// Returns the check timestamp.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Returns the optional detail message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
