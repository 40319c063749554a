//! Port contracts for launching tool server processes.

mod launcher;

pub use launcher::{
    LaunchError, LaunchedProcess, ProcessExit, ProcessLauncher, ProcessStdin, ProcessStdout,
    SpawnedProcess,
};
