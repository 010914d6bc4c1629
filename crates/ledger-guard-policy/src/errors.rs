//! Policy engine error types.
//!
//! Business-rule denials are not errors: they come back as a [`Verdict`]
//! with `allowed == false`. Only unresolvable lookups, malformed input and
//! infrastructure failures surface here.
//!
//! [`Verdict`]: crate::types::Verdict

use ledger_guard_storage::StorageError;
use thiserror::Error;

/// Policy engine errors
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Principal has no user record
    #[error("Principal not found: {0}")]
    PrincipalNotFound(String),

    /// Referenced resource does not exist
    #[error("Resource not found: {resource_type}/{resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Operation is missing required fields or names an unknown resource type
    #[error("Malformed operation: {0}")]
    MalformedOperation(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal policy error: {0}")]
    Internal(String),
}

impl PolicyError {
    /// Whether this is a lookup failure (principal or resource missing)
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            PolicyError::PrincipalNotFound(_) | PolicyError::ResourceNotFound { .. }
        )
    }
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
