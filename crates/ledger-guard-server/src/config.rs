use anyhow::{Context, Result};
use ledger_guard_policy::{
    rate_limit::{DEFAULT_MAX_TRANSACTIONS, DEFAULT_WINDOW_SECONDS, MAX_WINDOW_SECONDS},
    RateLimitConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Path to RocksDB database
    pub database_path: PathBuf,

    /// Sliding window applied to transaction creates and wallet updates
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .context("BIND_ADDRESS must be a socket address")?;

        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/ledger-guard.db".to_string())
            .into();

        let rate_limit = parse_rate_limit(
            std::env::var("RATE_LIMIT_WINDOW_SECONDS").ok(),
            std::env::var("RATE_LIMIT_MAX_TRANSACTIONS").ok(),
        )?;

        Ok(Config {
            bind_address,
            database_path,
            rate_limit,
        })
    }
}

/// Parse the rate limit settings, falling back to the defaults when unset
fn parse_rate_limit(window: Option<String>, max: Option<String>) -> Result<RateLimitConfig> {
    let window_seconds: u64 = window
        .unwrap_or_else(|| DEFAULT_WINDOW_SECONDS.to_string())
        .parse()
        .context("RATE_LIMIT_WINDOW_SECONDS must be an integer")?;

    let max_transactions: u32 = max
        .unwrap_or_else(|| DEFAULT_MAX_TRANSACTIONS.to_string())
        .parse()
        .context("RATE_LIMIT_MAX_TRANSACTIONS must be an integer")?;

    if window_seconds == 0 || window_seconds > MAX_WINDOW_SECONDS {
        anyhow::bail!(
            "RATE_LIMIT_WINDOW_SECONDS must be between 1 and {}",
            MAX_WINDOW_SECONDS
        );
    }

    Ok(RateLimitConfig {
        window_seconds,
        max_transactions,
    })
}
