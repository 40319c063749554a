//! Transport error type and failure classification.

use crate::protocol::RpcErrorObject;
use crate::session::domain::SessionError;
use crate::tool_registry::domain::{ToolRegistryDomainError, ToolServerId, TransportKind};
use std::fmt;
use thiserror::Error;

/// Coarse failure class used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad configuration; retrying will not help.
    Configuration,
    /// The server could not be reached or answered unusably.
    Transport,
    /// The server did not answer in time.
    Timeout,
    /// The subprocess session ended before answering.
    SessionTerminated,
}

impl FailureKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::SessionTerminated => "session_terminated",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors raised while delivering an envelope.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// A driver was handed a server configured for another transport.
    #[error("tool server {server_id} uses the {actual} transport, not {expected}")]
    TransportMismatch {
        /// Server identity.
        server_id: ToolServerId,
        /// Transport the driver serves.
        expected: TransportKind,
        /// Transport the server is configured with.
        actual: TransportKind,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client could not be configured: {0}")]
    ClientSetup(String),

    /// Subprocess session failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The HTTP request could not be completed.
    #[error("request to tool server {server_id} at {url} failed: {message}")]
    Http {
        /// Server identity.
        server_id: ToolServerId,
        /// Target URL.
        url: String,
        /// Client error text.
        message: String,
    },

    /// The HTTP request exceeded its timeout.
    #[error("request to tool server {server_id} at {url} timed out")]
    HttpTimeout {
        /// Server identity.
        server_id: ToolServerId,
        /// Target URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("tool server {server_id} answered HTTP {status}: {body}")]
    Status {
        /// Server identity.
        server_id: ToolServerId,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The body could not be read as a JSON-RPC response.
    #[error("tool server {server_id} returned an unusable body: {message}")]
    MalformedBody {
        /// Server identity.
        server_id: ToolServerId,
        /// Decoding problem.
        message: String,
    },

    /// The server answered a discovery or health request with an error.
    #[error("tool server {server_id} rejected {method}: {error}")]
    Remote {
        /// Server identity.
        server_id: ToolServerId,
        /// Method that failed.
        method: String,
        /// Remote error object.
        error: RpcErrorObject,
    },

    /// The `tools/list` result had an unusable shape.
    #[error("tool server {server_id} returned an unusable tool list: {source}")]
    MalformedToolList {
        /// Server identity.
        server_id: ToolServerId,
        /// Parsing problem.
        source: ToolRegistryDomainError,
    },
}

impl TransportError {
    /// Classifies the failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::TransportMismatch { .. } | Self::ClientSetup(_) => FailureKind::Configuration,
            Self::Session(session) => match session {
                SessionError::Timeout { .. } => FailureKind::Timeout,
                SessionError::Terminated { .. } => FailureKind::SessionTerminated,
                SessionError::Spawn { .. }
                | SessionError::HandshakeFailed { .. }
                | SessionError::Write { .. }
                | SessionError::MalformedOutput { .. } => FailureKind::Transport,
            },
            Self::HttpTimeout { .. } => FailureKind::Timeout,
            Self::Http { .. }
            | Self::Status { .. }
            | Self::MalformedBody { .. }
            | Self::Remote { .. }
            | Self::MalformedToolList { .. } => FailureKind::Transport,
        }
    }

    pub(crate) fn mismatch(
        server_id: &ToolServerId,
        expected: TransportKind,
        actual: TransportKind,
    ) -> Self {
        Self::TransportMismatch {
            server_id: server_id.clone(),
            expected,
            actual,
        }
    }
}
