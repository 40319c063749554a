//! TTL cache of tool descriptors per server.

use super::ToolDenyList;
use crate::tool_registry::domain::{ToolDescriptor, ToolServerId};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    tools: Vec<ToolDescriptor>,
    updated_at: DateTime<Utc>,
}

/// Discovered tool lists keyed by server, valid for a fixed TTL.
///
/// Expired entries are treated as absent and removed lazily. The deny-list
/// is applied on every read; the raw list is what gets stored. Concurrent
/// writers are last-writer-wins.
pub struct ToolSchemaCache<C>
where
    C: Clock + Send + Sync,
{
    clock: Arc<C>,
    ttl: TimeDelta,
    deny_list: ToolDenyList,
    entries: RwLock<HashMap<ToolServerId, CacheEntry>>,
}

impl<C> ToolSchemaCache<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new(clock: Arc<C>, ttl: Duration, deny_list: ToolDenyList) -> Self {
        Self {
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            deny_list,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the deny-filtered tools for a server when a fresh entry
    /// exists.
    #[must_use]
    pub fn get(&self, server_id: &ToolServerId) -> Option<Vec<ToolDescriptor>> {
        let now = self.clock.utc();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.get(server_id)?;
            if self.is_fresh(entry, now) {
                return Some(self.deny_list.filter(server_id, &entry.tools));
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(server_id)
            .is_some_and(|entry| !self.is_fresh(entry, now))
        {
            entries.remove(server_id);
            debug!(server_id = %server_id, "tool schema cache entry expired");
        }
        None
    }

    /// Stores the raw tool list for a server.
    pub fn put(&self, server_id: &ToolServerId, tools: Vec<ToolDescriptor>) {
        let entry = CacheEntry {
            tools,
            updated_at: self.clock.utc(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server_id.clone(), entry);
    }

    /// Drops the entry for one server, or every entry when `None`.
    pub fn invalidate(&self, server_id: Option<&ToolServerId>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match server_id {
            Some(id) => {
                entries.remove(id);
            }
            None => entries.clear(),
        }
    }

    /// Returns the number of fresh entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.utc();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| self.is_fresh(entry, now))
            .count()
    }

    /// Returns whether no fresh entry exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the deny-list applied on reads.
    #[must_use]
    pub const fn deny_list(&self) -> &ToolDenyList {
        &self.deny_list
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.updated_at) < self.ttl
    }
}

impl<C> std::fmt::Debug for ToolSchemaCache<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ToolSchemaCache")
            .field("ttl", &self.ttl)
            .field("deny_list", &self.deny_list)
            .finish_non_exhaustive()
    }
}
