//! Job aggregate and status machine.

use super::{JobDomainError, JobId};
use crate::tool_registry::domain::{CallerId, ToolServerId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted, waiting for the worker.
    Pending,
    /// Claimed by the worker and invoking the tool.
    Running,
    /// The tool returned a result.
    Completed,
    /// The invocation failed.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns whether moving to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Running | Self::Cancelled)
                | (Self::Running, Self::Completed | Self::Failed | Self::Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// What a caller asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    caller_id: CallerId,
    server_id: ToolServerId,
    tool_name: String,
    params: Value,
}

impl JobRequest {
    /// Creates a validated job request.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EmptyToolName`] when the tool name is blank.
    pub fn new(
        caller_id: CallerId,
        server_id: ToolServerId,
        tool: impl Into<String>,
        params: Value,
    ) -> Result<Self, JobDomainError> {
        let tool_name = tool.into().trim().to_owned();
        if tool_name.is_empty() {
            return Err(JobDomainError::EmptyToolName);
        }
        Ok(Self {
            caller_id,
            server_id,
            tool_name,
            params,
        })
    }

    /// Returns the caller.
    #[must_use]
    pub const fn caller_id(&self) -> &CallerId {
        &self.caller_id
    }

    /// Returns the target server.
    #[must_use]
    pub const fn server_id(&self) -> &ToolServerId {
        &self.server_id
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the tool arguments.
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }
}

/// Persisted long-running invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    caller_id: CallerId,
    server_id: ToolServerId,
    tool_name: String,
    params: Value,
    status: JobStatus,
    result: Option<Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job from a request.
    #[must_use]
    pub fn pending(request: JobRequest, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: JobId::new(),
            caller_id: request.caller_id,
            server_id: request.server_id,
            tool_name: request.tool_name,
            params: request.params,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: timestamp,
            updated_at: timestamp,
            started_at: None,
            finished_at: None,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the caller that enqueued the job.
    #[must_use]
    pub const fn caller_id(&self) -> &CallerId {
        &self.caller_id
    }

    /// Returns the target server.
    #[must_use]
    pub const fn server_id(&self) -> &ToolServerId {
        &self.server_id
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the tool arguments.
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the tool result once completed.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the failure message once failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when the worker claimed the job.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the job reached a terminal status.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Marks the job as claimed by the worker.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] unless the job is pending.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.transition(JobStatus::Running, clock)?;
        self.started_at = Some(self.updated_at);
        Ok(())
    }

    /// Records a successful result.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] unless the job is running.
    pub fn complete(&mut self, result: Value, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.transition(JobStatus::Completed, clock)?;
        self.result = Some(result);
        self.finished_at = Some(self.updated_at);
        Ok(())
    }

    /// Records a failure.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] unless the job is running.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.transition(JobStatus::Failed, clock)?;
        self.error = Some(error.into());
        self.finished_at = Some(self.updated_at);
        Ok(())
    }

    /// Cancels a pending or running job.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is already
    /// terminal.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.transition(JobStatus::Cancelled, clock)?;
        self.finished_at = Some(self.updated_at);
        Ok(())
    }

    fn transition(&mut self, target: JobStatus, clock: &impl Clock) -> Result<(), JobDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(JobDomainError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}
