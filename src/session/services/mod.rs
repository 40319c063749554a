//! Session actor, per-identity registry and the automation supervisor.

mod actor;
mod automation;
mod registry;

pub use actor::{SessionClient, SessionHandle};
pub use automation::{AutomationSessionSupervisor, LockSignatures};
pub use registry::SessionRegistry;
