//! One-minute counting window.

use crate::tool_registry::domain::{CallerId, ToolServerId};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Returns the start of the UTC minute containing `now`.
#[must_use]
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_second(0)
        .and_then(|instant| instant.with_nanosecond(0))
        .unwrap_or(now)
}

/// Invocation count of one caller against one server within one minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    server_id: ToolServerId,
    caller_id: CallerId,
    window_start: DateTime<Utc>,
    count: u32,
}

impl RateWindow {
    /// Opens a window with a count of one.
    #[must_use]
    pub fn open(server_id: ToolServerId, caller_id: CallerId, window_start: DateTime<Utc>) -> Self {
        Self {
            server_id,
            caller_id,
            window_start,
            count: 1,
        }
    }

    /// Counts one more invocation, returning the new count.
    pub const fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Returns the server identity.
    #[must_use]
    pub const fn server_id(&self) -> &ToolServerId {
        &self.server_id
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn caller_id(&self) -> &CallerId {
        &self.caller_id
    }

    /// Returns the window start.
    #[must_use]
    pub const fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// Returns the count.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }
}
