//! Policy engine type definitions.

use crate::errors::{PolicyError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A resource snapshot as delivered by the document store
pub type Document = serde_json::Map<String, Value>;

/// Principal role, looked up from the principal's user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// An authenticated actor with its resolved role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resource types guarded by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Wallet,
    Transaction,
    AuditLog,
}

impl ResourceType {
    /// Collection name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Wallet => "wallets",
            ResourceType::Transaction => "transactions",
            ResourceType::AuditLog => "auditLogs",
        }
    }
}

impl FromStr for ResourceType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wallets" | "wallet" => Ok(ResourceType::Wallet),
            "transactions" | "transaction" => Ok(ResourceType::Transaction),
            "auditLogs" | "auditLog" => Ok(ResourceType::AuditLog),
            other => Err(PolicyError::MalformedOperation(format!(
                "unknown resource type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, OperationKind::Read)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request submitted by an external caller
///
/// The caller has authenticated `principal_id` but does not get to assert a
/// role; the engine resolves it from the user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub kind: OperationKind,
    pub resource_type: String,
    pub resource_id: String,
    pub principal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed: Option<Document>,
}

/// Operation with a resolved principal, as consumed by the evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub kind: OperationKind,
    pub resource_type: String,
    pub resource_id: String,
    pub principal: Principal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed: Option<Document>,
}

impl Operation {
    pub fn from_request(request: AccessRequest, principal: Principal) -> Self {
        Self {
            kind: request.kind,
            resource_type: request.resource_type,
            resource_id: request.resource_id,
            principal,
            existing: request.existing,
            proposed: request.proposed,
        }
    }
}

/// Individual checks a verdict can fail on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Ownership,
    StructuralValidation,
    RateLimit,
    FieldDiff,
    Immutable,
    Role,
    BackendOnly,
}

impl Check {
    pub fn tag(&self) -> &'static str {
        match self {
            Check::Ownership => "ownership",
            Check::StructuralValidation => "structural_validation",
            Check::RateLimit => "rate_limit",
            Check::FieldDiff => "field_diff",
            Check::Immutable => "immutable",
            Check::Role => "role",
            Check::BackendOnly => "backend_only",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Allow/deny outcome of evaluating one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// First failing check, if denied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Check>,
    #[serde(default)]
    pub audit_tags: Vec<String>,
}

impl Verdict {
    pub fn allow(audit_tags: Vec<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            check: None,
            audit_tags,
        }
    }

    pub fn deny(check: Check, reason: impl fmt::Display, mut audit_tags: Vec<String>) -> Self {
        audit_tags.push(check.tag().to_string());
        Self {
            allowed: false,
            reason: Some(format!("{}: {}", check.tag(), reason)),
            check: Some(check),
            audit_tags,
        }
    }
}

/// Principal record owned by the user store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub role: Role,
}

/// Entry in a wallet's transaction list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRef {
    pub transaction_id: String,
    pub amount: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub owner_id: String,
    pub balance: Decimal,
    #[serde(default)]
    pub transactions: Vec<TransactionRef>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub hash: String,
}

/// Audit trail record, written only by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub principal_id: String,
    pub action: OperationKind,
    pub resource_type: ResourceType,
    pub resource_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

/// Convert a typed record into a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PolicyError::Internal(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(PolicyError::Internal(e.to_string())),
    }
}

/// Convert a document into a typed record
pub fn from_document<T: serde::de::DeserializeOwned>(document: &Document) -> Result<T> {
    serde_json::from_value(Value::Object(document.clone()))
        .map_err(|e| PolicyError::MalformedOperation(e.to_string()))
}
