//! Process launcher port.

use crate::tool_registry::domain::{ProcessTransportConfig, ToolServerId};
use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Writable end of a process's stdin.
pub type ProcessStdin = Box<dyn AsyncWrite + Send + Unpin>;

/// Readable end of a process's stdout or stderr.
pub type ProcessStdout = Box<dyn AsyncRead + Send + Unpin>;

/// Exit report of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(formatter, "exit code {code}"),
            None => formatter.write_str("terminated by signal"),
        }
    }
}

/// Control surface of a spawned process.
#[async_trait]
pub trait SpawnedProcess: Send {
    /// Waits for the process to exit. Must be cancel safe.
    async fn wait(&mut self) -> io::Result<ProcessExit>;

    /// Asks the process to terminate gracefully (SIGTERM on Unix).
    fn request_termination(&mut self) -> io::Result<()>;

    /// Forcefully kills the process and reaps it.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Pipes and control handle of a freshly launched process.
pub struct LaunchedProcess {
    /// Process stdin.
    pub stdin: ProcessStdin,
    /// Process stdout.
    pub stdout: ProcessStdout,
    /// Process stderr, drained for diagnostics when present.
    pub stderr: Option<ProcessStdout>,
    /// Control handle.
    pub process: Box<dyn SpawnedProcess>,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LaunchedProcess")
            .field("stderr", &self.stderr.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors returned by process launchers.
#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    /// The operating system refused to start the process.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        /// Command that failed.
        command: String,
        /// Underlying I/O error.
        source: Arc<io::Error>,
    },

    /// A required pipe was not captured.
    #[error("process started without a piped {0}")]
    MissingPipe(&'static str),
}

impl LaunchError {
    /// Wraps a spawn failure.
    #[must_use]
    pub fn spawn(command: &str, source: io::Error) -> Self {
        Self::Spawn {
            command: command.to_owned(),
            source: Arc::new(source),
        }
    }
}

/// Starts tool server processes with piped stdio.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launches the configured process.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the process cannot be started.
    async fn launch(
        &self,
        server_id: &ToolServerId,
        config: &ProcessTransportConfig,
    ) -> Result<LaunchedProcess, LaunchError>;
}
