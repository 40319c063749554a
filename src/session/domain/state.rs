//! Session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a live or finished session.
///
/// The absence of a session entry is the uninitialized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Process spawned, handshake not yet answered.
    Initializing,
    /// Handshake completed; calls are dispatched.
    Ready,
    /// Shutdown requested; the process is being torn down.
    Closing,
    /// The process exited, closed stdout or failed its handshake.
    Crashed,
}

impl SessionState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Crashed => "crashed",
        }
    }

    /// Returns whether the session still accepts calls.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Initializing | Self::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
