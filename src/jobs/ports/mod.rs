//! Port contracts for job persistence, signalling and execution.

mod invoker;
mod repository;
mod signal;

pub use invoker::{ToolInvocationError, ToolInvoker};
pub use repository::{JobRepository, JobRepositoryError, JobRepositoryResult};
pub use signal::{JobSignal, JobSignalError};
