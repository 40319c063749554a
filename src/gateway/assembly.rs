//! Wires the in-memory adapters, drivers and services into one gateway.

use super::{GatewayResult, RoutedToolInvoker, ToolGateway, TransportDrivers, TransportRouter};
use crate::jobs::{
    adapters::{ChannelJobSignal, memory::InMemoryJobRepository},
    services::{JobQueueService, JobWorker},
};
use crate::rate_limit::{adapters::memory::InMemoryRateWindowStore, services::RateLimiter};
use crate::schema_cache::ToolSchemaCache;
use crate::session::{ports::ProcessLauncher, services::SessionRegistry};
use crate::settings::Settings;
use crate::tool_registry::adapters::memory::InMemoryToolServerCatalog;
use crate::transport::adapters::{HttpStreamDriver, ProcessDriver, RestDriver, build_http_client};
use mockable::Clock;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Gateway over the in-memory catalog, job repository and rate windows.
pub type InMemoryToolGateway<C> =
    ToolGateway<InMemoryToolServerCatalog, InMemoryJobRepository, InMemoryRateWindowStore, C>;

/// A running gateway with its session registry and job worker.
pub struct GatewayStack<L, C>
where
    L: ProcessLauncher + 'static,
    C: Clock + Send + Sync + 'static,
{
    gateway: Arc<InMemoryToolGateway<C>>,
    sessions: Arc<SessionRegistry<L>>,
    worker: JoinHandle<()>,
}

impl<L, C> GatewayStack<L, C>
where
    L: ProcessLauncher + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Builds the stack from settings and spawns the job worker.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`](super::GatewayError::Transport)
    /// when the HTTP client cannot be built.
    pub fn assemble(settings: &Settings, launcher: Arc<L>, clock: Arc<C>) -> GatewayResult<Self> {
        let sessions = Arc::new(SessionRegistry::new(launcher, settings.session.clone()));
        let http_client = build_http_client(settings.http.request_timeout)?;
        let drivers = TransportDrivers {
            process: Arc::new(ProcessDriver::new(
                Arc::clone(&sessions),
                settings.lock_signatures.clone(),
            )),
            http_stream: Arc::new(
                HttpStreamDriver::new(http_client.clone(), settings.http.body_excerpt_chars)
                    .with_client_info(
                        settings.session.client_name.clone(),
                        settings.session.client_version.clone(),
                    ),
            ),
            rest: Arc::new(RestDriver::new(http_client, settings.http.body_excerpt_chars)),
        };

        let cache = Arc::new(ToolSchemaCache::new(
            Arc::clone(&clock),
            settings.cache.discovery_ttl,
            settings.cache.deny_list.clone(),
        ));
        let router = Arc::new(TransportRouter::new(drivers, cache, Arc::clone(&clock)));
        let catalog = Arc::new(InMemoryToolServerCatalog::with_servers(
            settings.servers.iter().cloned(),
        ));

        let (signal, receiver) = ChannelJobSignal::new();
        let jobs = JobQueueService::new(
            Arc::new(InMemoryJobRepository::new()),
            Arc::new(signal),
            Arc::new(RoutedToolInvoker::new(
                Arc::clone(&catalog),
                Arc::clone(&router),
            )),
            Arc::clone(&clock),
        );
        let worker = JobWorker::spawn(jobs.clone(), receiver);
        let limiter = RateLimiter::new(Arc::new(InMemoryRateWindowStore::new()), Arc::clone(&clock));

        let gateway = Arc::new(ToolGateway::new(
            catalog,
            router,
            limiter,
            jobs,
            clock,
            settings.cache.overview_ttl,
        ));

        Ok(Self {
            gateway,
            sessions,
            worker,
        })
    }

    /// Returns the gateway.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<InMemoryToolGateway<C>> {
        &self.gateway
    }

    /// Returns the session registry behind the process driver.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionRegistry<L>> {
        &self.sessions
    }

    /// Tears down every session and stops the job worker.
    pub async fn shutdown(self) {
        self.gateway.shutdown().await;
        self.worker.abort();
    }
}

impl<L, C> std::fmt::Debug for GatewayStack<L, C>
where
    L: ProcessLauncher + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GatewayStack")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
