//! Error types for tool server domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tool registry domain values.
///
/// Every variant is a configuration problem: it is raised before any I/O
/// and is never worth retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryDomainError {
    /// The server identifier is empty after trimming.
    #[error("tool server id must not be empty")]
    EmptyServerId,

    /// The server identifier contains characters outside `[a-z0-9_-]`.
    #[error(
        "tool server id '{0}' contains invalid characters (only lowercase alphanumeric, '_' and '-' allowed)"
    )]
    InvalidServerId(String),

    /// The server identifier exceeds the 100-character storage limit.
    #[error("tool server id exceeds 100 character limit: {0}")]
    ServerIdTooLong(String),

    /// The human-readable server name is empty after trimming.
    #[error("tool server name must not be empty")]
    EmptyServerName,

    /// The caller identifier is empty after trimming.
    #[error("caller id must not be empty")]
    EmptyCallerId,

    /// The caller identifier exceeds the storage limit.
    #[error("caller id exceeds 200 character limit: {0}")]
    CallerIdTooLong(String),

    /// The process command is empty.
    #[error("process command must not be empty")]
    EmptyProcessCommand,

    /// The process working directory is empty after trimming.
    #[error("process working directory must not be empty when provided")]
    EmptyWorkingDirectory,

    /// An endpoint URL is empty.
    #[error("{transport} URL must not be empty")]
    EmptyUrl {
        /// Transport kind the URL belongs to.
        transport: &'static str,
    },

    /// An endpoint URL does not have an `http://` or `https://` prefix.
    #[error("{transport} URL '{url}' must start with 'http://' or 'https://'")]
    InvalidUrl {
        /// Transport kind the URL belongs to.
        transport: &'static str,
        /// Offending URL.
        url: String,
    },

    /// A REST path does not start with `/`.
    #[error("REST path '{0}' must start with '/'")]
    InvalidRestPath(String),

    /// A header name is empty after trimming.
    #[error("header name must not be empty")]
    EmptyHeaderName,

    /// A tool descriptor name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// A `tools/list` result is neither an array nor an object with `tools`.
    #[error("tools/list result must be an array or an object with a 'tools' array")]
    MalformedToolList,

    /// A per-minute rate limit of zero would deny every call.
    #[error("rate limit per minute must be greater than zero")]
    ZeroRateLimit,

    /// Persistent automation servers cannot run calls inline.
    #[error("persistent automation servers must use the long_running execution mode")]
    InteractiveAutomationServer,
}
