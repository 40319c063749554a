//! Timing and framing limits applied to every session.

use std::time::Duration;

/// Settings shared by every stdio session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Per-call deadline, measured from dispatch.
    pub call_timeout: Duration,
    /// Deadline for the `initialize` handshake.
    pub handshake_timeout: Duration,
    /// Time allowed for graceful termination before a forced kill.
    pub termination_grace: Duration,
    /// Pause after teardown so the next process does not race on shared
    /// resources such as profile locks.
    pub settle_delay: Duration,
    /// Largest unterminated stdout line tolerated before the session ends.
    pub max_line_bytes: usize,
    /// Client name announced in the handshake.
    pub client_name: String,
    /// Client version announced in the handshake.
    pub client_version: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(30),
            termination_grace: Duration::from_secs(5),
            settle_delay: Duration::from_millis(500),
            max_line_bytes: 16 * 1024 * 1024,
            client_name: env!("CARGO_PKG_NAME").to_owned(),
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}
