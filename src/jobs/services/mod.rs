//! Job queue orchestration.

mod queue;
mod worker;

pub use queue::{JobQueueError, JobQueueResult, JobQueueService};
pub use worker::JobWorker;
