//! Tool gateway: catalog lookup, rate limiting, queueing and routing.

use super::{GatewayError, GatewayResult, ServerOverview, ToolOverview, TransportRouter};
use crate::jobs::{
    domain::{Job, JobId, JobRequest},
    ports::JobRepository,
    services::{JobQueueError, JobQueueService},
};
use crate::protocol::RpcResponse;
use crate::rate_limit::{ports::RateWindowStore, services::RateLimiter};
use crate::tool_registry::domain::{
    CallerId, ExecutionMode, ToolDescriptor, ToolServerConfig, ToolServerHealth, ToolServerId,
};
use crate::tool_registry::ports::ToolServerCatalog;
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of [`ToolGateway::call_tool`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// Interactive server answered; the response may still carry a
    /// JSON-RPC error.
    Completed(RpcResponse),
    /// Long-running server; poll the job for the outcome.
    Queued(JobId),
}

/// Single entry point for callers.
pub struct ToolGateway<K, J, S, C>
where
    K: ToolServerCatalog,
    J: JobRepository,
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    catalog: Arc<K>,
    router: Arc<TransportRouter<C>>,
    limiter: RateLimiter<S, C>,
    jobs: JobQueueService<J, C>,
    clock: Arc<C>,
    overview_ttl: TimeDelta,
    overview: RwLock<Option<ToolOverview>>,
}

impl<K, J, S, C> ToolGateway<K, J, S, C>
where
    K: ToolServerCatalog,
    J: JobRepository,
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    /// Creates a gateway.
    #[must_use]
    pub fn new(
        catalog: Arc<K>,
        router: Arc<TransportRouter<C>>,
        limiter: RateLimiter<S, C>,
        jobs: JobQueueService<J, C>,
        clock: Arc<C>,
        overview_ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            router,
            limiter,
            jobs,
            clock,
            overview_ttl: TimeDelta::from_std(overview_ttl).unwrap_or(TimeDelta::MAX),
            overview: RwLock::new(None),
        }
    }

    /// Returns the transport router.
    #[must_use]
    pub const fn router(&self) -> &Arc<TransportRouter<C>> {
        &self.router
    }

    /// Returns the server catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<K> {
        &self.catalog
    }

    /// Invokes a tool on behalf of a caller.
    ///
    /// Servers with a per-minute limit are rate limited per caller.
    /// Long-running servers are queued and the caller receives a job id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownServer`],
    /// [`GatewayError::RateLimitExceeded`], or the underlying transport or
    /// job queue failure.
    pub async fn call_tool(
        &self,
        caller_id: &CallerId,
        server_id: &ToolServerId,
        tool_name: &str,
        arguments: Value,
    ) -> GatewayResult<ToolCallOutcome> {
        let server = self.server(server_id).await?;

        if let Some(limit) = server.rate_limit_per_minute()
            && !self
                .limiter
                .check_and_increment(server_id, caller_id, limit)
                .await
        {
            return Err(GatewayError::RateLimitExceeded {
                server_id: server_id.clone(),
                caller_id: caller_id.clone(),
                limit: limit.get(),
            });
        }

        match server.execution() {
            ExecutionMode::LongRunning => {
                let request =
                    JobRequest::new(caller_id.clone(), server_id.clone(), tool_name, arguments)
                        .map_err(JobQueueError::from)?;
                let job_id = self.jobs.enqueue(request).await?;
                Ok(ToolCallOutcome::Queued(job_id))
            }
            ExecutionMode::Interactive => {
                let response = self.router.call_tool(&server, tool_name, arguments).await?;
                debug!(
                    server_id = %server_id,
                    caller_id = %caller_id,
                    tool = tool_name,
                    is_error = response.is_error(),
                    "tool call completed"
                );
                Ok(ToolCallOutcome::Completed(response))
            }
        }
    }

    /// Returns a server's visible tools.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownServer`] or the discovery failure.
    pub async fn list_tools(&self, server_id: &ToolServerId) -> GatewayResult<Vec<ToolDescriptor>> {
        let server = self.server(server_id).await?;
        Ok(self.router.discover_tools(&server).await?)
    }

    /// Checks one server's health.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownServer`] for unregistered servers.
    pub async fn health(&self, server_id: &ToolServerId) -> GatewayResult<ToolServerHealth> {
        let server = self.server(server_id).await?;
        Ok(self.router.health_check(&server).await)
    }

    /// Returns every registered server with its health and tools.
    ///
    /// The overview is reused until its TTL lapses. Servers that fail are
    /// listed as unhealthy with no tools.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Catalog`] when the catalog cannot be listed.
    pub async fn tool_overview(&self) -> GatewayResult<ToolOverview> {
        if let Some(cached) = self.fresh_overview() {
            return Ok(cached);
        }

        let servers = self.catalog.list_all().await?;
        let mut entries = Vec::with_capacity(servers.len());
        for server in servers {
            entries.push(self.collect(&server).await);
        }

        let overview = ToolOverview {
            generated_at: self.clock.utc(),
            servers: entries,
        };
        info!(
            servers = overview.servers.len(),
            tools = overview.tool_count(),
            "tool overview collected"
        );
        *self.overview.write().unwrap_or_else(PoisonError::into_inner) = Some(overview.clone());
        Ok(overview)
    }

    /// Adds a server to the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Catalog`] when the identity is taken.
    pub async fn register_server(&self, server: &ToolServerConfig) -> GatewayResult<()> {
        self.catalog.register(server).await?;
        self.invalidate_overview();
        info!(server_id = %server.id(), transport = server.transport().kind().as_str(), "tool server registered");
        Ok(())
    }

    /// Replaces a server's configuration, tearing down its session and
    /// dropping its cached tools.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Catalog`] when the server is not registered.
    pub async fn replace_server(&self, server: &ToolServerConfig) -> GatewayResult<()> {
        self.catalog.update(server).await?;
        self.router.forget(server.id()).await;
        self.invalidate_overview();
        info!(server_id = %server.id(), "tool server replaced");
        Ok(())
    }

    /// Returns a queued job.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Jobs`] for unknown jobs.
    pub async fn job_status(&self, job_id: JobId) -> GatewayResult<Job> {
        Ok(self.jobs.get_status(job_id).await?)
    }

    /// Cancels a queued or running job.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Jobs`] for unknown jobs.
    pub async fn cancel_job(&self, job_id: JobId) -> GatewayResult<Job> {
        Ok(self.jobs.cancel(job_id).await?)
    }

    /// Lists a caller's jobs, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Jobs`] when the job store fails.
    pub async fn jobs_for_caller(&self, caller_id: &CallerId) -> GatewayResult<Vec<Job>> {
        Ok(self.jobs.list_for_caller(caller_id).await?)
    }

    /// Tears down every session.
    pub async fn shutdown(&self) {
        info!("gateway shutting down");
        self.router.shutdown().await;
    }

    async fn server(&self, server_id: &ToolServerId) -> GatewayResult<ToolServerConfig> {
        self.catalog
            .find_by_id(server_id)
            .await?
            .ok_or_else(|| GatewayError::UnknownServer(server_id.clone()))
    }

    async fn collect(&self, server: &ToolServerConfig) -> ServerOverview {
        let mut health = self.router.health_check(server).await;
        let tools = if health.is_healthy() {
            match self.router.discover_tools(server).await {
                Ok(tools) => tools,
                Err(err) => {
                    warn!(server_id = %server.id(), error = %err, "tool discovery failed");
                    health = ToolServerHealth::unhealthy(self.clock.utc(), err.to_string());
                    Vec::new()
                }
            }
        } else {
            warn!(
                server_id = %server.id(),
                message = health.message().unwrap_or_default(),
                "tool server unhealthy"
            );
            Vec::new()
        };

        ServerOverview {
            server_id: server.id().clone(),
            name: server.name().to_owned(),
            transport: server.transport().kind(),
            health,
            tools,
        }
    }

    fn fresh_overview(&self) -> Option<ToolOverview> {
        let guard = self.overview.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|overview| self.clock.utc() - overview.generated_at < self.overview_ttl)
            .cloned()
    }

    fn invalidate_overview(&self) {
        *self.overview.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<K, J, S, C> std::fmt::Debug for ToolGateway<K, J, S, C>
where
    K: ToolServerCatalog,
    J: JobRepository,
    S: RateWindowStore,
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ToolGateway")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
