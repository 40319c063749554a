//! Launcher that spawns real subprocesses through `tokio::process`.

use crate::session::ports::{
    LaunchError, LaunchedProcess, ProcessExit, ProcessLauncher, SpawnedProcess,
};
use crate::tool_registry::domain::{ProcessTransportConfig, ToolServerId};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Spawns tool servers as child processes with piped stdio.
///
/// Children are killed when their handle is dropped, so a crashed host does
/// not leak tool server processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    /// Creates a launcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(
        &self,
        server_id: &ToolServerId,
        config: &ProcessTransportConfig,
    ) -> Result<LaunchedProcess, LaunchError> {
        let mut command = Command::new(config.command());
        command
            .args(config.args())
            .envs(config.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(directory) = config.working_directory() {
            command.current_dir(directory);
        }

        let mut child = command
            .spawn()
            .map_err(|err| LaunchError::spawn(config.command(), err))?;
        let stdin = child.stdin.take().ok_or(LaunchError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(LaunchError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take();

        debug!(
            server_id = %server_id,
            command = config.command(),
            pid = child.id(),
            "spawned tool server process"
        );

        Ok(LaunchedProcess {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: stderr.map(|pipe| Box::new(pipe) as _),
            process: Box::new(TokioChild { child }),
        })
    }
}

struct TokioChild {
    child: Child,
}

#[async_trait]
impl SpawnedProcess for TokioChild {
    async fn wait(&mut self) -> io::Result<ProcessExit> {
        let status = self.child.wait().await?;
        Ok(ProcessExit {
            code: status.code(),
        })
    }

    #[cfg(unix)]
    fn request_termination(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(raw_pid) = self.child.id() else {
            return Ok(());
        };
        let pid = i32::try_from(raw_pid).map_err(io::Error::other)?;
        kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn request_termination(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}
