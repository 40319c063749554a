//! Job domain model.

mod error;
mod ids;
mod job;

pub use error::JobDomainError;
pub use ids::JobId;
pub use job::{Job, JobRequest, JobStatus};
