//! Background executor for queued jobs.

use crate::jobs::{domain::JobId, ports::JobRepository, services::JobQueueService};
use mockable::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Consumes job signals and executes each job on its own task.
#[derive(Debug)]
pub struct JobWorker;

impl JobWorker {
    /// Spawns the worker loop. It ends when every signal sender is dropped.
    #[must_use]
    pub fn spawn<R, C>(
        service: JobQueueService<R, C>,
        mut receiver: mpsc::UnboundedReceiver<JobId>,
    ) -> JoinHandle<()>
    where
        R: JobRepository + 'static,
        C: Clock + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            while let Some(job_id) = receiver.recv().await {
                let executor = service.clone();
                drop(tokio::spawn(async move {
                    if let Err(err) = executor.execute(job_id).await {
                        error!(job_id = %job_id, error = %err, "job execution failed");
                    }
                }));
            }
            debug!("job worker stopped");
        })
    }
}
