//! RocksDB column family definitions.

/// Principal records: principal_id → UserRecord
pub const CF_USERS: &str = "users";

/// Wallet documents: wallet_id → Document
pub const CF_WALLETS: &str = "wallets";

/// Transaction documents: transaction_id → Document
pub const CF_TRANSACTIONS: &str = "transactions";

/// Transactions by user index: (user_id, transaction_id) → timestamp (epoch millis)
pub const CF_TRANSACTIONS_BY_USER: &str = "transactions_by_user";

/// Audit trail: audit_id → Document (backend writes only)
pub const CF_AUDIT_LOGS: &str = "audit_logs";

/// Get all column family names
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        CF_USERS,
        CF_WALLETS,
        CF_TRANSACTIONS,
        CF_TRANSACTIONS_BY_USER,
        CF_AUDIT_LOGS,
    ]
}
