//! Sliding-window rate limiting over a principal's recent transactions.
//!
//! Nothing is stored here. The window is rebuilt from the transaction
//! history supplied by the user store on every evaluation, so the limiter is
//! a pure filter-and-count over that history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default window length (5 minutes)
pub const DEFAULT_WINDOW_SECONDS: u64 = 300;

/// Default number of transactions allowed per window
pub const DEFAULT_MAX_TRANSACTIONS: u32 = 10;

/// Longest window a deployment may configure (one year)
pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_transactions: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        // Duration::seconds panics above i64::MAX / 1000
        let seconds = self.window_seconds.min(i64::MAX as u64 / 1_000) as i64;
        Duration::seconds(seconds)
    }

    /// Exclusive start of the window ending at `now`
    ///
    /// Saturates at the earliest representable instant instead of panicking.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
        }
    }
}

/// Transaction timestamps of one principal that fall inside the window
///
/// The window is open at `window_start` and closed at `now`: an entry exactly
/// at `window_start` is excluded, an entry exactly at `now` is counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTransactionWindow {
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
    timestamps: Vec<DateTime<Utc>>,
}

impl RecentTransactionWindow {
    /// Build the window from a principal's transaction history
    pub fn from_history(history: &[DateTime<Utc>], now: DateTime<Utc>, config: &RateLimitConfig) -> Self {
        let window_start = config.window_start(now);
        let mut timestamps: Vec<DateTime<Utc>> = history
            .iter()
            .copied()
            .filter(|ts| *ts > window_start && *ts <= now)
            .collect();
        timestamps.sort_unstable();

        Self {
            window_start,
            now,
            timestamps,
        }
    }

    /// Window for an evaluation that does not consult the rate limit
    pub fn empty(now: DateTime<Utc>, config: &RateLimitConfig) -> Self {
        Self::from_history(&[], now, config)
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Rate limit info reported with a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub count: u32,
    pub max_transactions: u32,
    pub remaining: u32,
    pub window_start: DateTime<Utc>,
    /// When the oldest counted transaction leaves the window
    pub reset_at: Option<DateTime<Utc>>,
}

/// Rate limiter for money-moving writes
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Start of the window ending at `now` (exclusive)
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.config.window_start(now)
    }

    /// Build the recent-transaction window for `history` at `now`
    pub fn window(&self, history: &[DateTime<Utc>], now: DateTime<Utc>) -> RecentTransactionWindow {
        RecentTransactionWindow::from_history(history, now, &self.config)
    }

    /// Check a principal's history at `now`
    pub fn check(&self, history: &[DateTime<Utc>], now: DateTime<Utc>) -> RateLimitStatus {
        self.check_window(&self.window(history, now))
    }

    /// Check an already-built window
    ///
    /// Allowed while the count is strictly below the maximum.
    pub fn check_window(&self, window: &RecentTransactionWindow) -> RateLimitStatus {
        let count = u32::try_from(window.count()).unwrap_or(u32::MAX);
        let max = self.config.max_transactions;

        RateLimitStatus {
            allowed: count < max,
            count,
            max_transactions: max,
            remaining: max.saturating_sub(count),
            window_start: window.window_start(),
            reset_at: window
                .timestamps()
                .first()
                .map(|oldest| {
                    oldest
                        .checked_add_signed(self.config.window())
                        .unwrap_or(DateTime::<Utc>::MAX_UTC)
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_705_320_000, 0).unwrap()
    }

    fn seconds_ago(n: i64) -> DateTime<Utc> {
        now() - Duration::seconds(n)
    }

    #[test]
    fn test_empty_history_passes() {
        let limiter = RateLimiter::default();
        let status = limiter.check(&[], now());

        assert!(status.allowed);
        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 10);
        assert_eq!(status.reset_at, None);
    }

    #[test]
    fn test_nine_in_window_passes() {
        let limiter = RateLimiter::default();
        let history: Vec<_> = (1..=9).map(|i| seconds_ago(i * 10)).collect();

        let status = limiter.check(&history, now());
        assert!(status.allowed);
        assert_eq!(status.remaining, 1);
    }

    #[test]
    fn test_ten_in_window_denied() {
        let limiter = RateLimiter::default();
        let history: Vec<_> = (1..=10).map(|i| seconds_ago(i * 10)).collect();

        let status = limiter.check(&history, now());
        assert!(!status.allowed);
        assert_eq!(status.count, 10);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn test_entry_at_window_start_is_excluded() {
        let limiter = RateLimiter::default();
        let mut history: Vec<_> = (1..=9).map(|i| seconds_ago(i * 10)).collect();
        history.push(seconds_ago(300));

        let status = limiter.check(&history, now());
        assert!(status.allowed);
        assert_eq!(status.count, 9);
        assert_eq!(status.window_start, seconds_ago(300));
    }

    #[test]
    fn test_entry_just_inside_window_counts() {
        let limiter = RateLimiter::default();
        let mut history: Vec<_> = (1..=9).map(|i| seconds_ago(i * 10)).collect();
        history.push(now() - Duration::milliseconds(299_999));

        assert!(!limiter.check(&history, now()).allowed);
    }

    #[test]
    fn test_entry_at_now_counts_and_future_entries_do_not() {
        let config = RateLimitConfig::default();
        let history = vec![now(), now() + Duration::seconds(1)];

        let window = RecentTransactionWindow::from_history(&history, now(), &config);
        assert_eq!(window.timestamps(), &[now()]);
    }

    #[test]
    fn test_reset_at_tracks_oldest_entry() {
        let limiter = RateLimiter::default();
        let history = vec![seconds_ago(10), seconds_ago(200), seconds_ago(50)];

        let status = limiter.check(&history, now());
        assert_eq!(status.reset_at, Some(seconds_ago(200) + Duration::seconds(300)));
    }

    #[test]
    fn test_custom_config() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_transactions: 2,
        });
        let history = vec![seconds_ago(10), seconds_ago(20), seconds_ago(120)];

        let status = limiter.check(&history, now());
        assert!(!status.allowed);
        assert_eq!(status.count, 2);
    }

    #[test]
    fn test_oversized_window_saturates() {
        for window_seconds in [100_000_000_000_000, u64::MAX] {
            let limiter = RateLimiter::new(RateLimitConfig {
                window_seconds,
                max_transactions: 10,
            });
            let history = vec![seconds_ago(86_400 * 365 * 100), now()];

            let status = limiter.check(&history, now());
            assert!(status.allowed);
            assert_eq!(status.count, 2);
            assert_eq!(status.window_start, DateTime::<Utc>::MIN_UTC);
            assert_eq!(status.reset_at, Some(DateTime::<Utc>::MAX_UTC));
        }
    }
}
