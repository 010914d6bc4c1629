//! Guarded write path: evaluate against the stored snapshot, then commit
//! conditionally on that same snapshot.

use crate::{
    engine::PolicyEngine,
    errors::{PolicyError, Result},
    traits::{ResourceStore, WriteSet},
    types::*,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of submitting a request through the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GatewayOutcome {
    /// Read allowed; `document` is the stored snapshot
    Read {
        verdict: Verdict,
        document: Option<Document>,
    },
    /// Write allowed and committed together with its audit record
    #[serde(rename_all = "camelCase")]
    Committed { verdict: Verdict, audit_id: String },
    /// Policy denied the request; nothing was written
    Denied { verdict: Verdict },
    /// Allowed, but the resource changed after it was evaluated; nothing was
    /// written and the caller may retry
    Conflict { verdict: Verdict },
}

impl GatewayOutcome {
    pub fn verdict(&self) -> &Verdict {
        match self {
            GatewayOutcome::Read { verdict, .. }
            | GatewayOutcome::Committed { verdict, .. }
            | GatewayOutcome::Denied { verdict }
            | GatewayOutcome::Conflict { verdict } => verdict,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, GatewayOutcome::Committed { .. })
    }
}

/// Trusted backend that performs writes on behalf of principals
///
/// The caller-supplied `existing` snapshot is never trusted: the gateway
/// loads the current document, evaluates against it and commits only if the
/// store still holds that exact document.
pub struct LedgerGateway<E: PolicyEngine, R: ResourceStore> {
    engine: Arc<E>,
    resources: Arc<R>,
}

impl<E: PolicyEngine, R: ResourceStore> LedgerGateway<E, R> {
    pub fn new(engine: Arc<E>, resources: Arc<R>) -> Self {
        Self { engine, resources }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Evaluate a request and, if allowed, carry it out
    pub async fn submit(&self, mut request: AccessRequest) -> Result<GatewayOutcome> {
        let resource_type: ResourceType = request.resource_type.parse()?;
        let kind = request.kind;
        let principal_id = request.principal_id.clone();
        let resource_id = request.resource_id.clone();

        let current = self.resources.get(resource_type, &resource_id).await?;
        if current.is_none() && kind != OperationKind::Create {
            return Err(PolicyError::ResourceNotFound {
                resource_type: resource_type.to_string(),
                resource_id,
            });
        }

        request.existing = match kind {
            OperationKind::Create => None,
            _ => current.clone(),
        };
        let proposed = request.proposed.clone();

        let verdict = self.engine.evaluate(request).await?;
        if !verdict.allowed {
            return Ok(GatewayOutcome::Denied { verdict });
        }

        let document = match kind {
            OperationKind::Read => {
                return Ok(GatewayOutcome::Read {
                    verdict,
                    document: current,
                })
            }
            OperationKind::Delete => None,
            OperationKind::Create | OperationKind::Update => Some(proposed.ok_or_else(|| {
                PolicyError::MalformedOperation("proposed snapshot is required".to_string())
            })?),
        };

        let recorded_at = self.engine.now();
        let audit = AuditLog {
            id: Uuid::new_v4().to_string(),
            principal_id: principal_id.clone(),
            action: kind,
            resource_type,
            resource_id: resource_id.clone(),
            at: recorded_at,
        };
        let audit_id = audit.id.clone();

        let write = WriteSet {
            resource_type,
            resource_id: resource_id.clone(),
            document,
            audit: Some(audit),
            recorded_at,
        };

        // Creates must not overwrite a document that appeared meanwhile
        let expected = match kind {
            OperationKind::Create => None,
            _ => current.as_ref(),
        };

        if self.resources.commit(write, expected).await? {
            info!(
                principal_id = %principal_id,
                operation = %kind,
                resource_type = %resource_type,
                resource_id = %resource_id,
                audit_id = %audit_id,
                "Committed guarded write"
            );
            Ok(GatewayOutcome::Committed { verdict, audit_id })
        } else {
            warn!(
                principal_id = %principal_id,
                operation = %kind,
                resource_type = %resource_type,
                resource_id = %resource_id,
                "Guarded write lost a concurrent update"
            );
            Ok(GatewayOutcome::Conflict { verdict })
        }
    }
}
