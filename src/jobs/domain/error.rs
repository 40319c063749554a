//! Error types for job domain validation.

use super::{JobId, JobStatus};
use thiserror::Error;

/// Errors returned while constructing or transitioning jobs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDomainError {
    /// The tool name is empty after trimming.
    #[error("job tool name must not be empty")]
    EmptyToolName,

    /// The requested status change is not permitted.
    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Job being transitioned.
        job_id: JobId,
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
}
