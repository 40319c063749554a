//! Registry holding at most one live session per tool server identity.

use super::actor::{SessionClient, SessionHandle};
use crate::protocol::{RpcEnvelope, RpcResponse};
use crate::session::domain::{SessionError, SessionSettings, SessionState};
use crate::session::ports::ProcessLauncher;
use crate::tool_registry::domain::{ProcessTransportConfig, ToolServerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Slot = Arc<AsyncMutex<Option<SessionHandle>>>;

/// Maps tool server identities to their sessions.
///
/// The map lock is held only for lookup and insert; spawning, handshakes and
/// teardown happen under the identity's own async slot lock, so identities
/// never block each other.
pub struct SessionRegistry<L>
where
    L: ProcessLauncher,
{
    launcher: Arc<L>,
    settings: Arc<SessionSettings>,
    slots: Mutex<HashMap<ToolServerId, Slot>>,
}

impl<L> SessionRegistry<L>
where
    L: ProcessLauncher + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(launcher: Arc<L>, settings: SessionSettings) -> Self {
        Self {
            launcher,
            settings: Arc::new(settings),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the shared session settings.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Sends a request through the identity's session, spawning one first
    /// when none is live.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when spawning fails or the call is not
    /// answered.
    pub async fn call(
        &self,
        server_id: &ToolServerId,
        config: &ProcessTransportConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, SessionError> {
        let client = self.acquire(server_id, config).await?;
        client.call(envelope).await
    }

    /// Returns a client for the identity's live session.
    ///
    /// A dead session, or one opened with a different configuration, is torn
    /// down and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] when the process cannot be launched.
    pub async fn acquire(
        &self,
        server_id: &ToolServerId,
        config: &ProcessTransportConfig,
    ) -> Result<SessionClient, SessionError> {
        let slot = self.slot(server_id);
        let mut guard = slot.lock().await;

        if let Some(handle) = guard.as_ref()
            && handle.client().is_live()
            && handle.config() == config
        {
            return Ok(handle.client().clone());
        }

        if let Some(stale) = guard.take() {
            if stale.config() == config {
                debug!(server_id = %server_id, state = %stale.client().state(), "replacing dead session");
            } else {
                info!(server_id = %server_id, "configuration changed, replacing session");
            }
            stale.shutdown().await;
        }

        let launched = self
            .launcher
            .launch(server_id, config)
            .await
            .map_err(|err| SessionError::Spawn {
                server_id: server_id.clone(),
                message: err.to_string(),
            })?;
        let handle = SessionHandle::start(
            server_id.clone(),
            config.clone(),
            launched,
            Arc::clone(&self.settings),
        );
        let client = handle.client().clone();
        *guard = Some(handle);
        Ok(client)
    }

    /// Starts an asynchronous teardown of the identity's session.
    ///
    /// Returns once the identity's slot is held; the slot stays held until
    /// the process is gone and the settle delay has passed, so the next call
    /// gets a fresh process. Await the returned handle to wait for teardown.
    pub async fn retire(&self, server_id: &ToolServerId) -> JoinHandle<()> {
        let slot = self.slot(server_id);
        let mut guard = slot.lock_owned().await;
        let identity = server_id.clone();
        tokio::spawn(async move {
            if let Some(handle) = guard.take() {
                info!(server_id = %identity, "retiring session");
                handle.shutdown().await;
            }
        })
    }

    /// Tears down the identity's session and waits for it to finish.
    pub async fn reset(&self, server_id: &ToolServerId) {
        let teardown = self.retire(server_id).await;
        if let Err(err) = teardown.await {
            warn!(server_id = %server_id, error = %err, "session teardown task failed");
        }
    }

    /// Tears down every session and waits for all of them.
    pub async fn shutdown_all(&self) {
        let identities: Vec<ToolServerId> = self.lock_slots().keys().cloned().collect();
        let mut teardowns = Vec::with_capacity(identities.len());
        for server_id in &identities {
            teardowns.push(self.retire(server_id).await);
        }
        for teardown in teardowns {
            if let Err(err) = teardown.await {
                warn!(error = %err, "session teardown task failed");
            }
        }
        info!(sessions = identities.len(), "all sessions shut down");
    }

    /// Returns the state of the identity's session, or `None` when no
    /// session exists.
    pub async fn state(&self, server_id: &ToolServerId) -> Option<SessionState> {
        let slot = self.existing_slot(server_id)?;
        let guard = slot.lock().await;
        guard.as_ref().map(|handle| handle.client().state())
    }

    /// Returns the identities whose sessions are live, ordered.
    pub async fn live_sessions(&self) -> Vec<ToolServerId> {
        let slots: Vec<(ToolServerId, Slot)> = self
            .lock_slots()
            .iter()
            .map(|(server_id, slot)| (server_id.clone(), Arc::clone(slot)))
            .collect();

        let mut live = Vec::new();
        for (server_id, slot) in slots {
            let guard = slot.lock().await;
            if guard.as_ref().is_some_and(|handle| handle.client().is_live()) {
                live.push(server_id);
            }
        }
        live.sort();
        live
    }

    /// Tears every session down when the host receives Ctrl-C.
    pub fn shutdown_on_ctrl_c(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, shutting down tool server sessions");
                    registry.shutdown_all().await;
                }
                Err(err) => warn!(error = %err, "could not listen for interrupt"),
            }
        })
    }

    fn slot(&self, server_id: &ToolServerId) -> Slot {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(server_id.clone()).or_default())
    }

    fn existing_slot(&self, server_id: &ToolServerId) -> Option<Slot> {
        self.lock_slots().get(server_id).map(Arc::clone)
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<ToolServerId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L> std::fmt::Debug for SessionRegistry<L>
where
    L: ProcessLauncher,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionRegistry")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
