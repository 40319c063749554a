//! Fixed-window rate limiter.

use crate::rate_limit::{domain::window_start, ports::RateWindowStore};
use crate::tool_registry::domain::{CallerId, ToolServerId};
use mockable::Clock;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counts invocations per (server, caller) in one-minute UTC windows.
///
/// The request that tips the window over the limit is still counted, so a
/// caller hammering a server stays denied for the rest of the minute.
#[derive(Clone)]
pub struct RateLimiter<S, C>
where
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> RateLimiter<S, C>
where
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    /// Creates a limiter.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Counts the invocation and returns whether it is allowed.
    ///
    /// Store failures fail open.
    pub async fn check_and_increment(
        &self,
        server_id: &ToolServerId,
        caller_id: &CallerId,
        limit: NonZeroU32,
    ) -> bool {
        let window = window_start(self.clock.utc());
        match self.store.increment(server_id, caller_id, window).await {
            Ok(count) => {
                let allowed = count <= limit.get();
                if !allowed {
                    debug!(
                        server_id = %server_id,
                        caller_id = %caller_id,
                        count,
                        limit = limit.get(),
                        "rate limit exceeded"
                    );
                }
                allowed
            }
            Err(err) => {
                warn!(
                    server_id = %server_id,
                    caller_id = %caller_id,
                    error = %err,
                    "rate window store failed, allowing call"
                );
                true
            }
        }
    }
}

impl<S, C> std::fmt::Debug for RateLimiter<S, C>
where
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
