//! Policy Engine trait and implementation.

use crate::{
    errors::Result,
    evaluator::PolicyEvaluator,
    principal::PrincipalResolver,
    rate_limit::{RateLimitConfig, RecentTransactionWindow},
    traits::{Clock, SystemClock, UserStore},
    types::*,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Policy Engine trait: the decision point external callers invoke
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Evaluate an access request
    ///
    /// Expected denials come back as `Ok` verdicts with `allowed == false`;
    /// errors are reserved for failed lookups and malformed requests.
    async fn evaluate(&self, request: AccessRequest) -> Result<Verdict>;

    /// Resolve the role of a principal
    async fn resolve_role(&self, principal_id: &str) -> Result<Role>;

    /// Whether a principal may post another transaction at `now`
    async fn check_rate_limit(&self, principal_id: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Instant the engine evaluates at
    fn now(&self) -> DateTime<Utc>;
}

/// Policy Engine implementation
///
/// Fetches the principal's role and, when the decision needs it, the
/// principal's recent transactions, then hands everything to the pure
/// [`PolicyEvaluator`].
pub struct PolicyEngineImpl<U: UserStore> {
    users: Arc<U>,
    resolver: PrincipalResolver<U>,
    evaluator: PolicyEvaluator,
    clock: Arc<dyn Clock>,
}

impl<U: UserStore> PolicyEngineImpl<U> {
    /// Create a new policy engine with the default rate limit and wall clock
    pub fn new(users: Arc<U>) -> Self {
        Self::with_config(users, RateLimitConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(users: Arc<U>, rate_limit: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver: PrincipalResolver::new(Arc::clone(&users)),
            users,
            evaluator: PolicyEvaluator::new(rate_limit),
            clock,
        }
    }

    pub fn rate_limit_config(&self) -> &RateLimitConfig {
        self.evaluator.rate_limiter().config()
    }

    async fn recent_window(&self, principal_id: &str, now: DateTime<Utc>) -> Result<RecentTransactionWindow> {
        let limiter = self.evaluator.rate_limiter();
        let since = limiter.window_start(now);
        let history = self.users.get_recent_transactions(principal_id, since).await?;
        Ok(limiter.window(&history, now))
    }
}

#[async_trait]
impl<U: UserStore> PolicyEngine for PolicyEngineImpl<U> {
    async fn evaluate(&self, request: AccessRequest) -> Result<Verdict> {
        let now = self.clock.now();
        let resource_type: ResourceType = request.resource_type.parse()?;
        let principal = self.resolver.resolve(&request.principal_id).await?;

        let recent = if PolicyEvaluator::needs_rate_limit(resource_type, request.kind) {
            self.recent_window(&principal.id, now).await?
        } else {
            RecentTransactionWindow::empty(now, self.rate_limit_config())
        };

        let operation = Operation::from_request(request, principal);
        let verdict = self.evaluator.evaluate(&operation, &recent)?;

        if verdict.allowed {
            tracing::debug!(
                principal_id = %operation.principal.id,
                operation = %operation.kind,
                resource_type = %resource_type,
                resource_id = %operation.resource_id,
                "Policy allowed operation"
            );
        } else {
            tracing::info!(
                principal_id = %operation.principal.id,
                operation = %operation.kind,
                resource_type = %resource_type,
                resource_id = %operation.resource_id,
                check = ?verdict.check,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "Policy denied operation"
            );
        }

        Ok(verdict)
    }

    async fn resolve_role(&self, principal_id: &str) -> Result<Role> {
        self.resolver.resolve_role(principal_id).await
    }

    async fn check_rate_limit(&self, principal_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let window = self.recent_window(principal_id, now).await?;
        Ok(self.evaluator.rate_limiter().check_window(&window).allowed)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PolicyError;
    use crate::traits::FixedClock;
    use chrono::{Duration, TimeZone};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct MockUsers {
        roles: HashMap<String, Role>,
        history: Vec<DateTime<Utc>>,
    }

    #[async_trait]
    impl UserStore for MockUsers {
        async fn get_user_role(&self, principal_id: &str) -> Result<Role> {
            self.roles
                .get(principal_id)
                .copied()
                .ok_or_else(|| PolicyError::PrincipalNotFound(principal_id.to_string()))
        }

        async fn get_recent_transactions(
            &self,
            _principal_id: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<DateTime<Utc>>> {
            Ok(self.history.iter().copied().filter(|ts| *ts >= since).collect())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_705_320_000, 0).unwrap()
    }

    fn engine(history: Vec<DateTime<Utc>>) -> PolicyEngineImpl<MockUsers> {
        let users = MockUsers {
            roles: HashMap::from([
                ("u1".to_string(), Role::User),
                ("root".to_string(), Role::Admin),
            ]),
            history,
        };
        PolicyEngineImpl::with_config(
            Arc::new(users),
            RateLimitConfig::default(),
            Arc::new(FixedClock::new(now())),
        )
    }

    fn create_transaction(principal_id: &str) -> AccessRequest {
        let proposed = json!({
            "userId": "u1",
            "amount": 50,
            "timestamp": now().timestamp_millis(),
            "hash": "a".repeat(64),
        });
        let Value::Object(proposed) = proposed else {
            unreachable!()
        };
        AccessRequest {
            kind: OperationKind::Create,
            resource_type: "transactions".to_string(),
            resource_id: "t1".to_string(),
            principal_id: principal_id.to_string(),
            existing: None,
            proposed: Some(proposed),
        }
    }

    #[tokio::test]
    async fn test_policy_engine_evaluate() {
        let verdict = engine(vec![]).evaluate(create_transaction("u1")).await.unwrap();
        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn test_rate_limited_create() {
        let history = (0..10).map(|i| now() - Duration::seconds(i * 20)).collect();
        let verdict = engine(history).evaluate(create_transaction("u1")).await.unwrap();

        assert!(!verdict.allowed);
        assert_eq!(verdict.check, Some(Check::RateLimit));
    }

    #[tokio::test]
    async fn test_unknown_principal_is_error() {
        let result = engine(vec![]).evaluate(create_transaction("ghost")).await;
        assert!(matches!(result, Err(PolicyError::PrincipalNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_resource_type_fails_before_lookup() {
        let mut request = create_transaction("ghost");
        request.resource_type = "cards".to_string();

        let result = engine(vec![]).evaluate(request).await;
        assert!(matches!(result, Err(PolicyError::MalformedOperation(_))));
    }

    #[tokio::test]
    async fn test_check_rate_limit() {
        let boundary = now() - Duration::seconds(300);
        let mut history: Vec<_> = (1..=9).map(|i| now() - Duration::seconds(i * 20)).collect();
        history.push(boundary);
        let engine = engine(history);

        assert!(engine.check_rate_limit("u1", now()).await.unwrap());
        // One millisecond later the boundary entry is still outside the window
        assert!(engine
            .check_rate_limit("u1", now() + Duration::milliseconds(1))
            .await
            .unwrap());
        // One millisecond earlier it is inside
        assert!(!engine
            .check_rate_limit("u1", now() - Duration::milliseconds(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_resolve_role() {
        let engine = engine(vec![]);
        assert_eq!(engine.resolve_role("root").await.unwrap(), Role::Admin);
    }
}
