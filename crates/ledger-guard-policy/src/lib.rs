//! # ledger-guard-policy
//!
//! Authorization and write-validation policy for a wallet ledger.
//!
//! This crate is responsible for:
//! - Deciding read/create/update/delete access to wallets, transactions and audit logs
//! - Structural validation of transaction and wallet writes
//! - Per-principal sliding-window rate limiting
//! - Field-diff guards on wallet updates
//! - A trusted gateway that commits allowed writes with an audit record

#![warn(clippy::all)]

pub mod diff;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod gateway;
pub mod principal;
pub mod rate_limit;
pub mod traits;
pub mod types;
pub mod validation;

pub use diff::FieldDiffGuard;
pub use directory::StorageDirectory;
pub use engine::{PolicyEngine, PolicyEngineImpl};
pub use errors::{PolicyError, Result};
pub use evaluator::PolicyEvaluator;
pub use gateway::{GatewayOutcome, LedgerGateway};
pub use principal::PrincipalResolver;
pub use rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter, RecentTransactionWindow};
pub use traits::{Clock, FixedClock, ResourceStore, SystemClock, UserStore, WriteSet};
pub use types::*;
pub use validation::{ValidationFailure, WriteValidator};
