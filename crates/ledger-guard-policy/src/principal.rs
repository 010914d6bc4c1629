//! Principal resolution.

use crate::{
    errors::{PolicyError, Result},
    traits::UserStore,
    types::{Principal, Role},
};
use std::sync::Arc;

/// Maps an authenticated principal id to a principal with its role
pub struct PrincipalResolver<U: UserStore> {
    users: Arc<U>,
}

impl<U: UserStore> PrincipalResolver<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Look up the role field of the principal's user record
    pub async fn resolve_role(&self, principal_id: &str) -> Result<Role> {
        if principal_id.is_empty() {
            return Err(PolicyError::MalformedOperation(
                "principal id is empty".to_string(),
            ));
        }
        self.users.get_user_role(principal_id).await
    }

    pub async fn resolve(&self, principal_id: &str) -> Result<Principal> {
        let role = self.resolve_role(principal_id).await?;
        Ok(Principal::new(principal_id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;

    struct StaticUsers(HashMap<String, Role>);

    #[async_trait]
    impl UserStore for StaticUsers {
        async fn get_user_role(&self, principal_id: &str) -> Result<Role> {
            self.0
                .get(principal_id)
                .copied()
                .ok_or_else(|| PolicyError::PrincipalNotFound(principal_id.to_string()))
        }

        async fn get_recent_transactions(
            &self,
            _principal_id: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<DateTime<Utc>>> {
            Ok(Vec::new())
        }
    }

    fn resolver() -> PrincipalResolver<StaticUsers> {
        let users = HashMap::from([
            ("u1".to_string(), Role::User),
            ("root".to_string(), Role::Admin),
        ]);
        PrincipalResolver::new(Arc::new(StaticUsers(users)))
    }

    #[tokio::test]
    async fn test_resolves_role() {
        let resolver = resolver();

        assert_eq!(resolver.resolve_role("u1").await.unwrap(), Role::User);
        let admin = resolver.resolve("root").await.unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_unknown_principal_is_lookup_error() {
        let err = resolver().resolve_role("ghost").await.unwrap_err();
        assert!(err.is_lookup());
    }

    #[tokio::test]
    async fn test_empty_principal_is_malformed() {
        let err = resolver().resolve_role("").await.unwrap_err();
        assert!(matches!(err, PolicyError::MalformedOperation(_)));
    }
}
