//! Storage-backed user and resource directory.

use crate::{
    errors::{PolicyError, Result},
    traits::{ResourceStore, UserStore, WriteSet},
    types::{AuditLog, Document, ResourceType, Role, UserRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ledger_guard_storage::{column_families::*, BatchExt, Storage};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Column family holding documents of a resource type
pub fn column_family(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Wallet => CF_WALLETS,
        ResourceType::Transaction => CF_TRANSACTIONS,
        ResourceType::AuditLog => CF_AUDIT_LOGS,
    }
}

/// User store and resource store over a [`Storage`] backend
///
/// Recent transactions come from the `transactions_by_user` index, which is
/// written in the same batch as every committed transaction document and
/// keyed on the commit instant.
pub struct StorageDirectory<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> StorageDirectory<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Provision or update a principal record
    pub async fn upsert_user(&self, record: &UserRecord) -> Result<()> {
        if record.id.is_empty() {
            return Err(PolicyError::MalformedOperation("user id is empty".to_string()));
        }
        self.storage.put(CF_USERS, &record.id, record).await?;
        debug!(principal_id = %record.id, role = ?record.role, "Upserted user record");
        Ok(())
    }

    pub async fn get_user(&self, principal_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.storage.get(CF_USERS, &principal_id).await?)
    }

    /// Every audit record, oldest first
    pub async fn audit_trail(&self) -> Result<Vec<AuditLog>> {
        let mut entries: Vec<AuditLog> = self
            .storage
            .scan_all::<AuditLog>(CF_AUDIT_LOGS)
            .await?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }
}

#[async_trait]
impl<S: Storage> UserStore for StorageDirectory<S> {
    async fn get_user_role(&self, principal_id: &str) -> Result<Role> {
        self.get_user(principal_id)
            .await?
            .map(|record| record.role)
            .ok_or_else(|| PolicyError::PrincipalNotFound(principal_id.to_string()))
    }

    async fn get_recent_transactions(
        &self,
        principal_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let entries: Vec<(Vec<u8>, i64)> = self
            .storage
            .get_by_prefix(CF_TRANSACTIONS_BY_USER, &principal_id)
            .await?;

        let mut timestamps: Vec<DateTime<Utc>> = entries
            .into_iter()
            .filter_map(|(_, millis)| Utc.timestamp_millis_opt(millis).single())
            .filter(|ts| *ts >= since)
            .collect();
        timestamps.sort_unstable();

        Ok(timestamps)
    }
}

#[async_trait]
impl<S: Storage> ResourceStore for StorageDirectory<S> {
    async fn get(&self, resource_type: ResourceType, resource_id: &str) -> Result<Option<Document>> {
        Ok(self
            .storage
            .get(column_family(resource_type), &resource_id)
            .await?)
    }

    async fn commit(&self, write: WriteSet, expected: Option<&Document>) -> Result<bool> {
        let cf = column_family(write.resource_type);
        let mut batch = self.storage.batch();

        match &write.document {
            Some(document) => batch.put(cf, &write.resource_id, document)?,
            None => batch.delete(cf, &write.resource_id)?,
        }

        if let (ResourceType::Transaction, Some(document)) = (write.resource_type, &write.document) {
            batch.put(
                CF_TRANSACTIONS_BY_USER,
                &(index_owner(document)?, write.resource_id.as_str()),
                &write.recorded_at.timestamp_millis(),
            )?;
        }

        if let Some(audit) = &write.audit {
            batch.put(CF_AUDIT_LOGS, &audit.id, audit)?;
        }

        let committed = self
            .storage
            .commit_if_unchanged(cf, &write.resource_id, expected, batch)
            .await?;

        debug!(
            resource_type = %write.resource_type,
            resource_id = %write.resource_id,
            committed,
            "Conditional resource write"
        );

        Ok(committed)
    }
}

fn index_owner(document: &Document) -> Result<&str> {
    match document.get("userId") {
        Some(Value::String(user_id)) => Ok(user_id.as_str()),
        _ => Err(PolicyError::MalformedOperation(
            "transaction userId must be a string".to_string(),
        )),
    }
}
