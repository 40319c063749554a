//! TOML configuration for the gateway and its tool servers.
//!
//! Every section is optional; missing values fall back to the defaults the
//! runtime uses. Server entries are validated into domain configurations at
//! load time so a bad file fails before any process is spawned.
//!
//! ```toml
//! [session]
//! call_timeout_secs = 60
//!
//! [cache]
//! discovery_ttl_secs = 45
//! deny = [{ server = "browser", tool = "evaluate" }]
//!
//! [[servers]]
//! id = "echo"
//! name = "Echo"
//! rate_limit_per_minute = 60
//!
//! [servers.transport]
//! kind = "process"
//! command = "echo-rpc-server"
//! ```

use crate::schema_cache::ToolDenyList;
use crate::session::domain::SessionSettings;
use crate::session::services::LockSignatures;
use crate::tool_registry::domain::{
    ExecutionMode, HttpStreamTransportConfig, NonJsonLinePolicy, ProcessSessionMode,
    ProcessTransportConfig, RestTransportConfig, ToolRegistryDomainError, ToolServerConfig,
    ToolServerId, ToolTransport,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("could not read settings file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// I/O failure.
        source: Arc<std::io::Error>,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A server entry failed validation.
    #[error("invalid tool server '{server}': {source}")]
    InvalidServer {
        /// Identity as written in the file.
        server: String,
        /// Validation failure.
        source: ToolRegistryDomainError,
    },

    /// A deny-list entry names an invalid server identity.
    #[error("invalid deny-list entry: {0}")]
    InvalidDenyEntry(ToolRegistryDomainError),

    /// Two server entries share an identity.
    #[error("tool server '{0}' is configured more than once")]
    DuplicateServer(ToolServerId),

    /// A limit that must be positive was set to zero.
    #[error("setting '{0}' must be greater than zero")]
    ZeroValue(&'static str),
}

/// HTTP client settings shared by the stream and REST drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Longest body excerpt carried in status errors.
    pub body_excerpt_chars: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            body_excerpt_chars: crate::transport::adapters::DEFAULT_BODY_EXCERPT_CHARS,
        }
    }
}

/// Cache lifetimes and structural suppression.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Lifetime of per-server discovery results.
    pub discovery_ttl: Duration,
    /// Lifetime of the aggregate tool overview.
    pub overview_ttl: Duration,
    /// Tools hidden from discovery.
    pub deny_list: ToolDenyList,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            discovery_ttl: Duration::from_secs(45),
            overview_ttl: Duration::from_secs(24 * 60 * 60),
            deny_list: ToolDenyList::new(),
        }
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Stdio session limits.
    pub session: SessionSettings,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Cache lifetimes and deny-list.
    pub cache: CacheSettings,
    /// Lock-contention signatures for persistent automation sessions.
    pub lock_signatures: LockSignatures,
    /// Registered tool servers, in file order.
    pub servers: Vec<ToolServerConfig>,
}

impl Settings {
    /// Reads and validates a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file = path.as_ref();
        let text = std::fs::read_to_string(file).map_err(|source| SettingsError::Read {
            path: file.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when parsing or validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings = toml::from_str(text)?;
        raw.validate()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    session: RawSession,
    http: RawHttp,
    cache: RawCache,
    automation: RawAutomation,
    servers: Vec<RawServer>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSession {
    call_timeout_secs: u64,
    handshake_timeout_secs: u64,
    termination_grace_secs: u64,
    settle_delay_ms: u64,
    max_line_bytes: usize,
    client_name: Option<String>,
    client_version: Option<String>,
}

impl Default for RawSession {
    fn default() -> Self {
        let defaults = SessionSettings::default();
        Self {
            call_timeout_secs: defaults.call_timeout.as_secs(),
            handshake_timeout_secs: defaults.handshake_timeout.as_secs(),
            termination_grace_secs: defaults.termination_grace.as_secs(),
            settle_delay_ms: u64::try_from(defaults.settle_delay.as_millis()).unwrap_or(u64::MAX),
            max_line_bytes: defaults.max_line_bytes,
            client_name: None,
            client_version: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawHttp {
    request_timeout_secs: u64,
    body_excerpt_chars: usize,
}

impl Default for RawHttp {
    fn default() -> Self {
        let defaults = HttpSettings::default();
        Self {
            request_timeout_secs: defaults.request_timeout.as_secs(),
            body_excerpt_chars: defaults.body_excerpt_chars,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCache {
    discovery_ttl_secs: u64,
    overview_ttl_secs: u64,
    deny: Vec<RawDenyEntry>,
}

impl Default for RawCache {
    fn default() -> Self {
        let defaults = CacheSettings::default();
        Self {
            discovery_ttl_secs: defaults.discovery_ttl.as_secs(),
            overview_ttl_secs: defaults.overview_ttl.as_secs(),
            deny: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDenyEntry {
    server: String,
    tool: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawAutomation {
    lock_signatures: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    id: String,
    name: Option<String>,
    execution: Option<ExecutionMode>,
    rate_limit_per_minute: Option<u32>,
    transport: RawTransport,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
enum RawTransport {
    Process {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
        working_directory: Option<String>,
        #[serde(default)]
        session_mode: ProcessSessionMode,
        #[serde(default)]
        non_json_lines: NonJsonLinePolicy,
    },
    HttpStream {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    Rest {
        base_url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        invoke_path: Option<String>,
        discovery_path: Option<String>,
        health_path: Option<String>,
    },
}

fn require_positive<T: Default + PartialEq>(name: &'static str, value: T) -> Result<T, SettingsError> {
    if value == T::default() {
        return Err(SettingsError::ZeroValue(name));
    }
    Ok(value)
}

impl RawSettings {
    fn validate(self) -> Result<Settings, SettingsError> {
        let call_timeout_secs =
            require_positive("session.call_timeout_secs", self.session.call_timeout_secs)?;
        let handshake_timeout_secs = require_positive(
            "session.handshake_timeout_secs",
            self.session.handshake_timeout_secs,
        )?;
        let max_line_bytes = require_positive("session.max_line_bytes", self.session.max_line_bytes)?;
        let request_timeout_secs =
            require_positive("http.request_timeout_secs", self.http.request_timeout_secs)?;

        let defaults = SessionSettings::default();
        let session = SessionSettings {
            call_timeout: Duration::from_secs(call_timeout_secs),
            handshake_timeout: Duration::from_secs(handshake_timeout_secs),
            termination_grace: Duration::from_secs(self.session.termination_grace_secs),
            settle_delay: Duration::from_millis(self.session.settle_delay_ms),
            max_line_bytes,
            client_name: self.session.client_name.unwrap_or(defaults.client_name),
            client_version: self.session.client_version.unwrap_or(defaults.client_version),
        };

        let http = HttpSettings {
            request_timeout: Duration::from_secs(request_timeout_secs),
            body_excerpt_chars: self.http.body_excerpt_chars,
        };

        let deny_list = self
            .cache
            .deny
            .into_iter()
            .map(|entry| {
                ToolServerId::new(entry.server)
                    .map(|server_id| (server_id, entry.tool))
                    .map_err(SettingsError::InvalidDenyEntry)
            })
            .collect::<Result<ToolDenyList, _>>()?;
        let cache = CacheSettings {
            discovery_ttl: Duration::from_secs(self.cache.discovery_ttl_secs),
            overview_ttl: Duration::from_secs(self.cache.overview_ttl_secs),
            deny_list,
        };

        let lock_signatures = self
            .automation
            .lock_signatures
            .map_or_else(LockSignatures::default, LockSignatures::new);

        let mut seen = BTreeSet::new();
        let mut servers = Vec::with_capacity(self.servers.len());
        for raw in self.servers {
            let label = raw.id.clone();
            let server = raw.into_config().map_err(|source| SettingsError::InvalidServer {
                server: label,
                source,
            })?;
            if !seen.insert(server.id().clone()) {
                return Err(SettingsError::DuplicateServer(server.id().clone()));
            }
            servers.push(server);
        }

        Ok(Settings {
            session,
            http,
            cache,
            lock_signatures,
            servers,
        })
    }
}

impl RawServer {
    fn into_config(self) -> Result<ToolServerConfig, ToolRegistryDomainError> {
        let id = ToolServerId::new(self.id)?;
        let name = self.name.unwrap_or_else(|| id.as_str().to_owned());
        let transport = self.transport.into_transport()?;
        let mut server = ToolServerConfig::new(id, name, transport)?;
        if let Some(execution) = self.execution {
            server = server.with_execution(execution)?;
        }
        let Some(limit) = self.rate_limit_per_minute else {
            return Ok(server);
        };
        server.with_rate_limit_per_minute(limit)
    }
}

impl RawTransport {
    fn into_transport(self) -> Result<ToolTransport, ToolRegistryDomainError> {
        match self {
            Self::Process {
                command,
                args,
                env,
                working_directory,
                session_mode,
                non_json_lines,
            } => {
                let mut config = ProcessTransportConfig::new(command)?
                    .with_args(args)
                    .with_env(env)
                    .with_session_mode(session_mode)
                    .with_non_json_lines(non_json_lines);
                if let Some(directory) = working_directory {
                    config = config.with_working_directory(directory)?;
                }
                Ok(ToolTransport::Process(config))
            }
            Self::HttpStream { url, headers } => Ok(ToolTransport::HttpStream(
                HttpStreamTransportConfig::new(url)?.with_headers(headers)?,
            )),
            Self::Rest {
                base_url,
                headers,
                invoke_path,
                discovery_path,
                health_path,
            } => {
                let mut config = RestTransportConfig::new(base_url)?.with_headers(headers)?;
                if let Some(path) = invoke_path {
                    config = config.with_invoke_path(path)?;
                }
                if let Some(path) = discovery_path {
                    config = config.with_discovery_path(path)?;
                }
                if let Some(path) = health_path {
                    config = config.with_health_path(path)?;
                }
                Ok(ToolTransport::Rest(config))
            }
        }
    }
}
