//! Session error type.

use crate::protocol::RequestId;
use crate::tool_registry::domain::ToolServerId;
use std::time::Duration;
use thiserror::Error;

/// Errors delivered to callers of a stdio session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The process could not be launched.
    #[error("failed to spawn tool server {server_id}: {message}")]
    Spawn {
        /// Server identity.
        server_id: ToolServerId,
        /// Launcher error text.
        message: String,
    },

    /// The `initialize` handshake failed, timed out or was answered with an
    /// error.
    #[error("handshake with tool server {server_id} failed: {reason}")]
    HandshakeFailed {
        /// Server identity.
        server_id: ToolServerId,
        /// Failure description.
        reason: String,
    },

    /// Writing the request to stdin failed.
    #[error("failed to write request {request_id} to tool server {server_id}: {message}")]
    Write {
        /// Server identity.
        server_id: ToolServerId,
        /// Affected request.
        request_id: RequestId,
        /// I/O error text.
        message: String,
    },

    /// The server printed a non-JSON line under the `reject` policy.
    #[error("tool server {server_id} produced malformed output: {line}")]
    MalformedOutput {
        /// Server identity.
        server_id: ToolServerId,
        /// Offending line, possibly shortened.
        line: String,
    },

    /// No response arrived before the per-call deadline.
    #[error("request {request_id} to tool server {server_id} timed out after {timeout:?}")]
    Timeout {
        /// Server identity.
        server_id: ToolServerId,
        /// Affected request.
        request_id: RequestId,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The session ended before the call was answered.
    #[error("session for tool server {server_id} terminated: {reason}")]
    Terminated {
        /// Server identity.
        server_id: ToolServerId,
        /// Termination cause.
        reason: String,
    },
}
