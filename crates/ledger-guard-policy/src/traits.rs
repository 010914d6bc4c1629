//! Collaborator interfaces the engine reads through.

use crate::{
    errors::Result,
    types::{AuditLog, Document, ResourceType, Role},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Principal/user store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Role on the principal's user record
    ///
    /// Fails with `PolicyError::PrincipalNotFound` if there is no record;
    /// no default role is assumed.
    async fn get_user_role(&self, principal_id: &str) -> Result<Role>;

    /// Timestamps of the principal's transactions at or after `since`,
    /// ascending
    async fn get_recent_transactions(
        &self,
        principal_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;
}

/// A write the gateway commits after an allowed verdict
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSet {
    pub resource_type: ResourceType,
    pub resource_id: String,
    /// New document; `None` deletes the resource
    pub document: Option<Document>,
    /// Audit record committed in the same batch
    pub audit: Option<AuditLog>,
    /// Commit instant; a created transaction is indexed for rate limiting
    /// at this time, never at its caller-supplied `timestamp`
    pub recorded_at: DateTime<Utc>,
}

/// Resource/document store
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Current snapshot of a resource
    async fn get(&self, resource_type: ResourceType, resource_id: &str) -> Result<Option<Document>>;

    /// Apply `write` only if the resource still equals `expected`
    ///
    /// Returns `Ok(false)` without writing anything if another writer got
    /// there first.
    async fn commit(&self, write: WriteSet, expected: Option<&Document>) -> Result<bool>;
}

/// Source of the evaluation instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
