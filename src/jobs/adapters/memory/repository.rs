//! Thread-safe in-memory job repository.

use crate::jobs::{
    domain::{Job, JobId, JobStatus},
    ports::{JobRepository, JobRepositoryError, JobRepositoryResult},
};
use crate::tool_registry::domain::CallerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory job repository; compare-and-swap runs under one write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl InMemoryJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> JobRepositoryError {
    JobRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert(&self, job: &Job) -> JobRepositoryResult<()> {
        let mut jobs = self.jobs.write().map_err(lock_error)?;
        if jobs.contains_key(&job.id()) {
            return Err(JobRepositoryError::DuplicateJob(job.id()));
        }
        jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> JobRepositoryResult<Option<Job>> {
        let jobs = self.jobs.read().map_err(lock_error)?;
        Ok(jobs.get(&id).cloned())
    }

    async fn compare_and_swap(&self, expected: JobStatus, job: &Job) -> JobRepositoryResult<bool> {
        let mut jobs = self.jobs.write().map_err(lock_error)?;
        let stored = jobs
            .get_mut(&job.id())
            .ok_or_else(|| JobRepositoryError::NotFound(job.id()))?;
        if stored.status() != expected {
            return Ok(false);
        }
        *stored = job.clone();
        Ok(true)
    }

    async fn list_for_caller(&self, caller_id: &CallerId) -> JobRepositoryResult<Vec<Job>> {
        let jobs = self.jobs.read().map_err(lock_error)?;
        let mut owned: Vec<Job> = jobs
            .values()
            .filter(|job| job.caller_id() == caller_id)
            .cloned()
            .collect();
        owned.sort_by_key(Job::created_at);
        Ok(owned)
    }
}
