//! Historical feature extraction
//!
//! Derives the per-request feature vector from prior attempts in the
//! ledger. Read-then-compute only; no writes, no caching. Concurrent
//! ledger writes may race these reads, which is fine: features are
//! best-effort recent history, not a transactional snapshot.

use crate::storage::Ledger;
use crate::AppResult;

/// Lookback window for per-address history.
pub const ADDRESS_WINDOW_MINUTES: i64 = 60;

/// How many of a username's most recent attempts feed the failure rate.
pub const USERNAME_HISTORY_LIMIT: i64 = 50;

/// Feature vector for one scoring call. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFeatures {
    /// Attempts from the same address within the lookback window.
    pub address_frequency: usize,
    /// Distinct usernames seen from that address in the same window.
    pub username_variety: usize,
    /// Minutes between earliest and latest attempt in the address
    /// window; 0 with fewer than two attempts.
    pub time_spread_minutes: f64,
    /// Fraction of the username's recent attempts that failed.
    pub failure_rate: f64,
}

/// Compute the feature vector for a (username, address) pair.
///
/// Ledger errors propagate to the caller. Substituting zero features
/// on a failed read would score a storage outage as low risk, so the
/// extractor fails instead.
pub async fn extract_features(
    ledger: &dyn Ledger,
    username: &str,
    address: &str,
) -> AppResult<AnomalyFeatures> {
    let recent = ledger
        .attempts_by_address(address, ADDRESS_WINDOW_MINUTES)
        .await?;
    let history = ledger
        .attempts_by_username(username, USERNAME_HISTORY_LIMIT)
        .await?;

    let address_frequency = recent.len();

    let mut usernames: Vec<&str> = recent.iter().map(|a| a.username.as_str()).collect();
    usernames.sort_unstable();
    usernames.dedup();
    let username_variety = usernames.len();

    let time_spread_minutes = if recent.len() > 1 {
        let earliest = recent.iter().map(|a| a.timestamp).min().unwrap_or_default();
        let latest = recent.iter().map(|a| a.timestamp).max().unwrap_or_default();
        (latest - earliest).num_milliseconds() as f64 / 60_000.0
    } else {
        0.0
    };

    let failure_rate = if history.is_empty() {
        0.0
    } else {
        let failed = history.iter().filter(|a| !a.success).count();
        failed as f64 / history.len() as f64
    };

    Ok(AnomalyFeatures {
        address_frequency,
        username_variety,
        time_spread_minutes,
        failure_rate,
    })
}
