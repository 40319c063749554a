//! Tool server transport configuration value objects.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the session manager treats a subprocess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessSessionMode {
    /// Plain request/response session.
    #[default]
    Standard,
    /// Stateful automation engine whose responses are inspected for
    /// lock-contention signatures.
    PersistentAutomation,
}

/// What to do with stdout lines that are not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonJsonLinePolicy {
    /// Treat the line as incidental process output and skip it.
    #[default]
    Ignore,
    /// Fail the in-flight call with a malformed-output error.
    Reject,
}

/// Transport settings for a tool server hosted as a local subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTransportConfig {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_directory: Option<String>,
    session_mode: ProcessSessionMode,
    non_json_lines: NonJsonLinePolicy,
}

impl ProcessTransportConfig {
    /// Creates a new process transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyProcessCommand`] when `command`
    /// is empty after trimming.
    pub fn new(command: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized_command = command.into().trim().to_owned();
        if normalized_command.is_empty() {
            return Err(ToolRegistryDomainError::EmptyProcessCommand);
        }

        Ok(Self {
            command: normalized_command,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
            session_mode: ProcessSessionMode::Standard,
            non_json_lines: NonJsonLinePolicy::Ignore,
        })
    }

    /// Replaces command-line arguments.
    #[must_use]
    pub fn with_args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args = values.into_iter().collect();
        self
    }

    /// Replaces process environment variables.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Sets an explicit working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyWorkingDirectory`] when the
    /// provided value is empty after trimming.
    pub fn with_working_directory(
        mut self,
        value: impl Into<String>,
    ) -> Result<Self, ToolRegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ToolRegistryDomainError::EmptyWorkingDirectory);
        }

        self.working_directory = Some(normalized);
        Ok(self)
    }

    /// Sets the session mode.
    #[must_use]
    pub const fn with_session_mode(mut self, mode: ProcessSessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Sets the non-JSON stdout line policy.
    #[must_use]
    pub const fn with_non_json_lines(mut self, policy: NonJsonLinePolicy) -> Self {
        self.non_json_lines = policy;
        self
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the optional working directory.
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// Returns the session mode.
    #[must_use]
    pub const fn session_mode(&self) -> ProcessSessionMode {
        self.session_mode
    }

    /// Returns the non-JSON line policy.
    #[must_use]
    pub const fn non_json_lines(&self) -> NonJsonLinePolicy {
        self.non_json_lines
    }
}

/// Transport settings for a tool server reached by HTTP POST, answering
/// with JSON or a Server-Sent-Events stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpStreamTransportConfig {
    url: String,
    headers: BTreeMap<String, String>,
}

impl HttpStreamTransportConfig {
    /// Creates a new HTTP stream transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when `url` is empty or does not
    /// start with `http://` or `https://`.
    pub fn new(url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self {
            url: validate_url("http_stream", url.into())?,
            headers: BTreeMap::new(),
        })
    }

    /// Replaces request headers.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyHeaderName`] when a header
    /// name is blank.
    pub fn with_headers(
        mut self,
        values: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ToolRegistryDomainError> {
        self.headers = validate_headers(values)?;
        Ok(self)
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Transport settings for a REST-style tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestTransportConfig {
    base_url: String,
    headers: BTreeMap<String, String>,
    invoke_path: String,
    discovery_path: Option<String>,
    health_path: Option<String>,
}

impl RestTransportConfig {
    /// Default invoke path appended to the base URL.
    pub const DEFAULT_INVOKE_PATH: &'static str = "/invoke";

    /// Creates a new REST transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when `base_url` is empty or does
    /// not start with `http://` or `https://`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let validated = validate_url("rest", base_url.into())?;
        Ok(Self {
            base_url: validated.trim_end_matches('/').to_owned(),
            headers: BTreeMap::new(),
            invoke_path: Self::DEFAULT_INVOKE_PATH.to_owned(),
            discovery_path: None,
            health_path: None,
        })
    }

    /// Replaces request headers.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyHeaderName`] when a header
    /// name is blank.
    pub fn with_headers(
        mut self,
        values: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ToolRegistryDomainError> {
        self.headers = validate_headers(values)?;
        Ok(self)
    }

    /// Sets the invoke path.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidRestPath`] when the path
    /// does not start with `/`.
    pub fn with_invoke_path(mut self, path: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        self.invoke_path = validate_path(path.into())?;
        Ok(self)
    }

    /// Sets a dedicated discovery path queried with GET.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidRestPath`] when the path
    /// does not start with `/`.
    pub fn with_discovery_path(
        mut self,
        path: impl Into<String>,
    ) -> Result<Self, ToolRegistryDomainError> {
        self.discovery_path = Some(validate_path(path.into())?);
        Ok(self)
    }

    /// Sets a dedicated health path queried with GET.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidRestPath`] when the path
    /// does not start with `/`.
    pub fn with_health_path(mut self, path: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        self.health_path = Some(validate_path(path.into())?);
        Ok(self)
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the full invoke URL.
    #[must_use]
    pub fn invoke_url(&self) -> String {
        format!("{}{}", self.base_url, self.invoke_path)
    }

    /// Returns the full discovery URL when one is configured.
    #[must_use]
    pub fn discovery_url(&self) -> Option<String> {
        self.discovery_path
            .as_ref()
            .map(|path| format!("{}{path}", self.base_url))
    }

    /// Returns the full health URL when one is configured.
    #[must_use]
    pub fn health_url(&self) -> Option<String> {
        self.health_path
            .as_ref()
            .map(|path| format!("{}{path}", self.base_url))
    }
}

/// Discriminant of [`ToolTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Local subprocess.
    Process,
    /// HTTP POST answered with JSON or SSE.
    HttpStream,
    /// REST endpoint with vendor response shapes.
    Rest,
}

impl TransportKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::HttpStream => "http_stream",
            Self::Rest => "rest",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Supported tool server transport configuration variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum ToolTransport {
    /// Newline-delimited JSON-RPC over a subprocess's stdio.
    Process(ProcessTransportConfig),
    /// JSON-RPC over HTTP POST with JSON or SSE responses.
    HttpStream(HttpStreamTransportConfig),
    /// REST endpoint.
    Rest(RestTransportConfig),
}

impl ToolTransport {
    /// Creates a `process` transport.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`ProcessTransportConfig::new`].
    pub fn process(command: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self::Process(ProcessTransportConfig::new(command)?))
    }

    /// Creates an `http_stream` transport.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`HttpStreamTransportConfig::new`].
    pub fn http_stream(url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self::HttpStream(HttpStreamTransportConfig::new(url)?))
    }

    /// Creates a `rest` transport with the default invoke path.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`RestTransportConfig::new`].
    pub fn rest(base_url: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        Ok(Self::Rest(RestTransportConfig::new(base_url)?))
    }

    /// Returns the transport discriminant.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Process(_) => TransportKind::Process,
            Self::HttpStream(_) => TransportKind::HttpStream,
            Self::Rest(_) => TransportKind::Rest,
        }
    }

    /// Returns whether this is a persistent automation subprocess.
    #[must_use]
    pub const fn is_persistent_automation(&self) -> bool {
        matches!(
            self,
            Self::Process(config)
                if matches!(config.session_mode, ProcessSessionMode::PersistentAutomation)
        )
    }
}

fn validate_url(transport: &'static str, url: String) -> Result<String, ToolRegistryDomainError> {
    let normalized = url.trim().to_owned();
    if normalized.is_empty() {
        return Err(ToolRegistryDomainError::EmptyUrl { transport });
    }

    let has_valid_prefix = normalized.starts_with("http://") || normalized.starts_with("https://");
    if !has_valid_prefix {
        return Err(ToolRegistryDomainError::InvalidUrl {
            transport,
            url: normalized,
        });
    }

    Ok(normalized)
}

fn validate_path(path: String) -> Result<String, ToolRegistryDomainError> {
    let normalized = path.trim().to_owned();
    if !normalized.starts_with('/') {
        return Err(ToolRegistryDomainError::InvalidRestPath(normalized));
    }
    Ok(normalized)
}

fn validate_headers(
    values: impl IntoIterator<Item = (String, String)>,
) -> Result<BTreeMap<String, String>, ToolRegistryDomainError> {
    values
        .into_iter()
        .map(|(name, value)| {
            let trimmed = name.trim().to_owned();
            if trimmed.is_empty() {
                return Err(ToolRegistryDomainError::EmptyHeaderName);
            }
            Ok((trimmed, value))
        })
        .collect()
}
