//! Adapter implementations for the process launcher port.

mod scripted;
mod tokio_process;

pub use scripted::{ScriptStep, ScriptedProcessLauncher, TranscriptEntry};
pub use tokio_process::TokioProcessLauncher;
