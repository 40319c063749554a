//! Channel-backed job signal.

use crate::jobs::{
    domain::JobId,
    ports::{JobSignal, JobSignalError},
};
use tokio::sync::mpsc;

/// Sends job identifiers to a [`JobWorker`](crate::jobs::services::JobWorker).
#[derive(Debug, Clone)]
pub struct ChannelJobSignal {
    sender: mpsc::UnboundedSender<JobId>,
}

impl ChannelJobSignal {
    /// Creates a signal and the receiver the worker consumes.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobId>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobSignal for ChannelJobSignal {
    fn notify(&self, job_id: JobId) -> Result<(), JobSignalError> {
        self.sender
            .send(job_id)
            .map_err(|_| JobSignalError::Closed(job_id))
    }
}
