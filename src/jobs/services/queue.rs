//! Enqueue, poll, cancel and execute long-running invocations.

use crate::jobs::{
    domain::{Job, JobDomainError, JobId, JobRequest, JobStatus},
    ports::{JobRepository, JobRepositoryError, JobSignal, JobSignalError, ToolInvoker},
};
use crate::tool_registry::domain::CallerId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for job queue operations.
#[derive(Debug, Error)]
pub enum JobQueueError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] JobDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] JobRepositoryError),
    /// The job was persisted but the executor could not be woken.
    #[error(transparent)]
    Signal(#[from] JobSignalError),
    /// No job with this identifier exists.
    #[error("job not found: {0}")]
    NotFound(JobId),
}

/// Result type for job queue operations.
pub type JobQueueResult<T> = Result<T, JobQueueError>;

/// Job queue orchestration service.
pub struct JobQueueService<R, C>
where
    R: JobRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    signal: Arc<dyn JobSignal>,
    invoker: Arc<dyn ToolInvoker>,
    clock: Arc<C>,
}

impl<R, C> Clone for JobQueueService<R, C>
where
    R: JobRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            signal: Arc::clone(&self.signal),
            invoker: Arc::clone(&self.invoker),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> JobQueueService<R, C>
where
    R: JobRepository,
    C: Clock + Send + Sync,
{
    /// Creates a job queue service.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        signal: Arc<dyn JobSignal>,
        invoker: Arc<dyn ToolInvoker>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            repository,
            signal,
            invoker,
            clock,
        }
    }

    /// Persists a pending job and wakes the executor. Never runs inline.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Repository`] when persistence fails, or
    /// [`JobQueueError::Signal`] when the job was stored but no executor is
    /// listening.
    pub async fn enqueue(&self, request: JobRequest) -> JobQueueResult<JobId> {
        let job = Job::pending(request, &*self.clock);
        self.repository.insert(&job).await?;
        info!(
            job_id = %job.id(),
            server_id = %job.server_id(),
            tool = job.tool_name(),
            "job enqueued"
        );
        self.signal.notify(job.id())?;
        Ok(job.id())
    }

    /// Returns the current job record.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::NotFound`] for unknown identifiers.
    pub async fn get_status(&self, id: JobId) -> JobQueueResult<Job> {
        self.load(id).await
    }

    /// Cancels a pending or running job. Terminal jobs come back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::NotFound`] for unknown identifiers.
    pub async fn cancel(&self, id: JobId) -> JobQueueResult<Job> {
        loop {
            let current = self.load(id).await?;
            if current.status().is_terminal() {
                return Ok(current);
            }
            let mut cancelled = current.clone();
            cancelled.cancel(&*self.clock)?;
            if self
                .repository
                .compare_and_swap(current.status(), &cancelled)
                .await?
            {
                info!(job_id = %id, from = %current.status(), "job cancelled");
                return Ok(cancelled);
            }
            debug!(job_id = %id, "job changed during cancel, retrying");
        }
    }

    /// Runs a pending job to completion.
    ///
    /// Jobs that are no longer pending are returned unchanged. A job
    /// cancelled while its tool was running stays cancelled and the result is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::NotFound`] for unknown identifiers or
    /// [`JobQueueError::Repository`] when persistence fails.
    pub async fn execute(&self, id: JobId) -> JobQueueResult<Job> {
        let pending = self.load(id).await?;
        if pending.status() != JobStatus::Pending {
            debug!(job_id = %id, status = %pending.status(), "job not pending, skipping");
            return Ok(pending);
        }

        let mut running = pending;
        running.start(&*self.clock)?;
        if !self
            .repository
            .compare_and_swap(JobStatus::Pending, &running)
            .await?
        {
            return self.load(id).await;
        }
        debug!(job_id = %id, server_id = %running.server_id(), "job started");

        let outcome = self
            .invoker
            .invoke_tool(
                running.server_id(),
                running.tool_name(),
                running.params().clone(),
            )
            .await;

        let mut finished = running.clone();
        match outcome {
            Ok(result) => finished.complete(result, &*self.clock)?,
            Err(err) => {
                warn!(job_id = %id, error = %err, "job failed");
                finished.fail(err.message(), &*self.clock)?;
            }
        }

        if self
            .repository
            .compare_and_swap(JobStatus::Running, &finished)
            .await?
        {
            info!(job_id = %id, status = %finished.status(), "job finished");
            return Ok(finished);
        }

        info!(job_id = %id, "job cancelled while running, result dropped");
        self.load(id).await
    }

    /// Lists a caller's jobs, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Repository`] when persistence fails.
    pub async fn list_for_caller(&self, caller_id: &CallerId) -> JobQueueResult<Vec<Job>> {
        Ok(self.repository.list_for_caller(caller_id).await?)
    }

    async fn load(&self, id: JobId) -> JobQueueResult<Job> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| JobQueueError::NotFound(id))
    }
}
