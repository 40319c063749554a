//! Gateway error type.

use crate::jobs::services::JobQueueError;
use crate::tool_registry::domain::{CallerId, ToolServerId};
use crate::tool_registry::ports::ToolServerCatalogError;
use crate::transport::{FailureKind, TransportError};
use std::fmt;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Coarse class of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// Bad configuration; retrying will not help.
    Configuration,
    /// The server could not be reached or answered unusably.
    Transport,
    /// The server did not answer in time.
    Timeout,
    /// The subprocess session ended before answering.
    SessionTerminated,
    /// The caller exceeded the per-minute limit; retry later.
    RateLimited,
    /// The server or job does not exist.
    NotFound,
    /// A backing store failed.
    Storage,
}

impl GatewayErrorKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::SessionTerminated => "session_terminated",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }

    /// Returns whether the same request may succeed later.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Transport | Self::Timeout | Self::SessionTerminated | Self::RateLimited
        )
    }
}

impl From<FailureKind> for GatewayErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Configuration => Self::Configuration,
            FailureKind::Transport => Self::Transport,
            FailureKind::Timeout => Self::Timeout,
            FailureKind::SessionTerminated => Self::SessionTerminated,
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors returned by [`ToolGateway`](super::ToolGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No server with this identity is registered.
    #[error("unknown tool server: {0}")]
    UnknownServer(ToolServerId),

    /// The caller used up the server's per-minute allowance.
    #[error("caller {caller_id} exceeded {limit} calls per minute on tool server {server_id}")]
    RateLimitExceeded {
        /// Server identity.
        server_id: ToolServerId,
        /// Caller identity.
        caller_id: CallerId,
        /// Configured limit.
        limit: u32,
    },

    /// Delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] ToolServerCatalogError),

    /// Job queue operation failed.
    #[error(transparent)]
    Jobs(#[from] JobQueueError),
}

impl GatewayError {
    /// Classifies the failure.
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::UnknownServer(_)
            | Self::Catalog(ToolServerCatalogError::NotFound(_))
            | Self::Jobs(JobQueueError::NotFound(_)) => GatewayErrorKind::NotFound,
            Self::RateLimitExceeded { .. } => GatewayErrorKind::RateLimited,
            Self::Transport(err) => GatewayErrorKind::from(err.kind()),
            Self::Catalog(ToolServerCatalogError::DuplicateServer(_))
            | Self::Jobs(JobQueueError::Domain(_)) => GatewayErrorKind::Configuration,
            Self::Catalog(ToolServerCatalogError::Persistence(_)) | Self::Jobs(_) => {
                GatewayErrorKind::Storage
            }
        }
    }
}
