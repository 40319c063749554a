//! Out-of-band execution signal.

use crate::jobs::domain::JobId;
use thiserror::Error;

/// Wakes the executor for a freshly persisted job.
pub trait JobSignal: Send + Sync {
    /// Announces that `job_id` is ready to run.
    ///
    /// # Errors
    ///
    /// Returns [`JobSignalError::Closed`] when no executor is listening.
    fn notify(&self, job_id: JobId) -> Result<(), JobSignalError>;
}

/// Errors returned by job signal implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobSignalError {
    /// The executor has gone away.
    #[error("job executor is not running; job {0} stays pending")]
    Closed(JobId),
}
