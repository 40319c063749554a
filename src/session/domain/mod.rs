//! Session state, settings and errors.

mod error;
mod settings;
mod state;

pub use error::SessionError;
pub use settings::SessionSettings;
pub use state::SessionState;
