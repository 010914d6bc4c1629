//! Policy evaluator logic.

use crate::{
    diff::FieldDiffGuard,
    errors::{PolicyError, Result},
    rate_limit::{RateLimitConfig, RateLimiter, RecentTransactionWindow},
    types::*,
    validation::WriteValidator,
};
use serde_json::Value;

/// Policy evaluator for authorization decisions
///
/// A pure function of the operation and the recent-transaction window: no
/// I/O, no interior state. Admin grants extra read visibility only, never a
/// write bypass.
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    rate_limiter: RateLimiter,
}

impl PolicyEvaluator {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            rate_limiter: RateLimiter::new(config),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Whether evaluating `kind` on `resource_type` consults the rate limit
    pub fn needs_rate_limit(resource_type: ResourceType, kind: OperationKind) -> bool {
        matches!(
            (resource_type, kind),
            (ResourceType::Wallet, OperationKind::Update)
                | (ResourceType::Transaction, OperationKind::Create)
        )
    }

    /// Evaluate an operation and return a verdict
    ///
    /// Composite checks run in order ownership → structural validation →
    /// rate limit → field diff and stop at the first failure, which the
    /// verdict names. Malformed operations are rejected before any check
    /// runs.
    pub fn evaluate(&self, operation: &Operation, recent: &RecentTransactionWindow) -> Result<Verdict> {
        let resource_type: ResourceType = operation.resource_type.parse()?;

        if operation.principal.id.is_empty() {
            return Err(PolicyError::MalformedOperation("principal id is empty".to_string()));
        }
        if operation.resource_id.is_empty() {
            return Err(PolicyError::MalformedOperation("resource id is empty".to_string()));
        }

        let tags = vec![
            format!("operation:{}", operation.kind),
            format!("resource:{}", resource_type),
        ];
        let principal = &operation.principal;

        let verdict = match (resource_type, operation.kind) {
            (ResourceType::Wallet, OperationKind::Read) => {
                let owner = owner_of(required(operation.existing.as_ref(), "existing")?, "ownerId")?;
                Self::require_owner(principal, owner, resource_type, tags)
            }

            (ResourceType::Wallet, OperationKind::Create) => {
                let owner = owner_of(required(operation.proposed.as_ref(), "proposed")?, "ownerId")?;
                Self::require_owner(principal, owner, resource_type, tags)
            }

            (ResourceType::Wallet, OperationKind::Update) => {
                let existing = required(operation.existing.as_ref(), "existing")?;
                let proposed = required(operation.proposed.as_ref(), "proposed")?;
                let owner = owner_of(existing, "ownerId")?;

                let ownership = Self::require_owner(principal, owner, resource_type, tags);
                if !ownership.allowed {
                    return Ok(ownership);
                }
                let tags = ownership.audit_tags;

                if let Err(failure) = WriteValidator::check_wallet_write(proposed) {
                    return Ok(Verdict::deny(Check::StructuralValidation, failure, tags));
                }

                if let Some(denied) = self.check_rate_limit(recent, &tags) {
                    return Ok(denied);
                }

                let disallowed = FieldDiffGuard::disallowed_fields(resource_type, existing, proposed);
                if !disallowed.is_empty() {
                    return Ok(Verdict::deny(
                        Check::FieldDiff,
                        format!("fields [{}] may not be changed", disallowed.join(", ")),
                        tags,
                    ));
                }

                Verdict::allow(tags)
            }

            (ResourceType::Wallet, OperationKind::Delete) => {
                Verdict::deny(Check::Immutable, "wallets cannot be deleted", tags)
            }

            (ResourceType::Transaction, OperationKind::Read) => {
                let owner = owner_of(required(operation.existing.as_ref(), "existing")?, "userId")?;
                if principal.id == owner || principal.is_admin() {
                    Verdict::allow(tags)
                } else {
                    Verdict::deny(
                        Check::Ownership,
                        format!("principal {} does not own this transaction", principal.id),
                        tags,
                    )
                }
            }

            (ResourceType::Transaction, OperationKind::Create) => {
                let proposed = required(operation.proposed.as_ref(), "proposed")?;
                let owner = owner_of(proposed, "userId")?;

                let ownership = Self::require_owner(principal, owner, resource_type, tags);
                if !ownership.allowed {
                    return Ok(ownership);
                }
                let tags = ownership.audit_tags;

                if let Err(failure) = WriteValidator::check_transaction_write(proposed) {
                    return Ok(Verdict::deny(Check::StructuralValidation, failure, tags));
                }

                if let Some(denied) = self.check_rate_limit(recent, &tags) {
                    return Ok(denied);
                }

                Verdict::allow(tags)
            }

            (ResourceType::Transaction, OperationKind::Update | OperationKind::Delete) => Verdict::deny(
                Check::Immutable,
                format!("transactions cannot be {}d", operation.kind),
                tags,
            ),

            (ResourceType::AuditLog, OperationKind::Read) => {
                if principal.is_admin() {
                    Verdict::allow(tags)
                } else {
                    Verdict::deny(Check::Role, "admin role required to read audit logs", tags)
                }
            }

            (ResourceType::AuditLog, _) => Verdict::deny(
                Check::BackendOnly,
                "audit logs are written by the backend only",
                tags,
            ),
        };

        Ok(verdict)
    }

    fn require_owner(
        principal: &Principal,
        owner: &str,
        resource_type: ResourceType,
        tags: Vec<String>,
    ) -> Verdict {
        if principal.id == owner {
            Verdict::allow(tags)
        } else {
            Verdict::deny(
                Check::Ownership,
                format!("principal {} does not own this {}", principal.id, noun(resource_type)),
                tags,
            )
        }
    }

    fn check_rate_limit(&self, recent: &RecentTransactionWindow, tags: &[String]) -> Option<Verdict> {
        let status = self.rate_limiter.check_window(recent);
        if status.allowed {
            return None;
        }

        let config = self.rate_limiter.config();
        Some(Verdict::deny(
            Check::RateLimit,
            format!(
                "{} transactions in the last {}s (limit {})",
                status.count, config.window_seconds, config.max_transactions
            ),
            tags.to_vec(),
        ))
    }
}

fn noun(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Wallet => "wallet",
        ResourceType::Transaction => "transaction",
        ResourceType::AuditLog => "audit log",
    }
}

fn required<'a>(document: Option<&'a Document>, name: &str) -> Result<&'a Document> {
    document.ok_or_else(|| PolicyError::MalformedOperation(format!("{} snapshot is required", name)))
}

fn owner_of<'a>(document: &'a Document, field: &str) -> Result<&'a str> {
    match document.get(field) {
        Some(Value::String(owner)) => Ok(owner.as_str()),
        _ => Err(PolicyError::MalformedOperation(format!(
            "{} must be a string",
            field
        ))),
    }
}
