//! Risk assessment pipeline
//!
//! Feature extraction over the attempt ledger, the heuristic anomaly
//! scorer, and the block/allow decision gate. The scorer is a fixed
//! rule stack with hand-set thresholds, not a trained model.

pub mod features;
pub mod scorer;

pub use features::{extract_features, AnomalyFeatures};
pub use scorer::{
    compute_score, risk_level, should_block, RiskLevel, HIGH_RISK_THRESHOLD,
    MEDIUM_RISK_THRESHOLD,
};

use crate::storage::Ledger;
use crate::AppResult;

/// Full assessment for one login request: extract features from the
/// ledger, score them, clamp to [0, 1].
///
/// Ledger read failures propagate; a storage outage must never be
/// scored as low risk.
pub async fn calculate_risk_score(
    ledger: &dyn Ledger,
    username: &str,
    address: &str,
) -> AppResult<f64> {
    let features = extract_features(ledger, username, address).await?;
    Ok(compute_score(&features))
}
