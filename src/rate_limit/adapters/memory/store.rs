//! In-memory rate window store keyed by (server, caller).

use crate::rate_limit::{
    domain::RateWindow,
    ports::{RateWindowStore, RateWindowStoreError, RateWindowStoreResult},
};
use crate::tool_registry::domain::{CallerId, ToolServerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Thread-safe in-memory rate window store.
///
/// Keeps only the current window per key; a new window replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateWindowStore {
    windows: Arc<Mutex<HashMap<(ToolServerId, CallerId), RateWindow>>>,
}

impl InMemoryRateWindowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored window for a key.
    ///
    /// # Errors
    ///
    /// Returns [`RateWindowStoreError::Persistence`] when the lock is
    /// poisoned.
    pub fn window(
        &self,
        server_id: &ToolServerId,
        caller_id: &CallerId,
    ) -> RateWindowStoreResult<Option<RateWindow>> {
        let windows = self.windows.lock().map_err(|err| {
            RateWindowStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(windows
            .get(&(server_id.clone(), caller_id.clone()))
            .cloned())
    }
}

#[async_trait]
impl RateWindowStore for InMemoryRateWindowStore {
    async fn increment(
        &self,
        server_id: &ToolServerId,
        caller_id: &CallerId,
        window_start: DateTime<Utc>,
    ) -> RateWindowStoreResult<u32> {
        let mut windows = self.windows.lock().map_err(|err| {
            RateWindowStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let key = (server_id.clone(), caller_id.clone());
        match windows.get_mut(&key) {
            Some(window) if window.window_start() == window_start => Ok(window.increment()),
            _ => {
                windows.insert(
                    key,
                    RateWindow::open(server_id.clone(), caller_id.clone(), window_start),
                );
                Ok(1)
            }
        }
    }
}
