//! Attempt ledger and user store
//!
//! The risk pipeline only needs a query interface over stored attempts
//! and users; the engine behind it is swappable. `PgLedger` backs the
//! server, `MemoryLedger` backs tests and local development.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use async_trait::async_trait;

use crate::models::{AnomalyStats, LoginAttempt, NewLoginAttempt, User};
use crate::AppResult;

/// Query interface consumed by the login pipeline.
///
/// Attempt records are append-only: `record_attempt` is the only write
/// and nothing here mutates or deletes existing rows.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<User>;

    /// Append one attempt; the ledger assigns id and timestamp.
    async fn record_attempt(&self, attempt: NewLoginAttempt) -> AppResult<LoginAttempt>;

    /// Most recent attempts first, bounded by `limit`.
    async fn recent_attempts(&self, limit: i64) -> AppResult<Vec<LoginAttempt>>;

    /// A username's most recent attempts across all addresses.
    async fn attempts_by_username(&self, username: &str, limit: i64)
        -> AppResult<Vec<LoginAttempt>>;

    /// All attempts from one address within the lookback window.
    async fn attempts_by_address(
        &self,
        address: &str,
        window_minutes: i64,
    ) -> AppResult<Vec<LoginAttempt>>;

    /// All attempts within the lookback window, any address.
    async fn attempts_since(&self, window_minutes: i64) -> AppResult<Vec<LoginAttempt>>;

    /// Detection stats over failed attempts.
    async fn anomaly_stats(&self) -> AppResult<AnomalyStats>;
}

/// detectionRate = 100 * detected / total, 0 when nothing failed yet.
pub(crate) fn detection_rate(total: i64, detected: i64) -> f64 {
    if total > 0 {
        detected as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
