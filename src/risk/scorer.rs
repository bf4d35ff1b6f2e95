//! Heuristic anomaly scorer and decision gate
//!
//! Ordered, additive threshold rules over the feature vector. The
//! constants are fixed for scenario compatibility; changing them
//! changes which historical attempts count as detected.

use serde::Serialize;

use super::features::AnomalyFeatures;

/// At or above this score a login is blocked.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// At or above this score (and below high) a login is flagged.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

/// Discrete tier derived from the continuous score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Map a feature vector to a risk score in [0, 1].
///
/// Rules are evaluated in fixed order and their contributions summed:
/// address frequency bands, username variety bands, a burst signal
/// (many attempts from one address in under two minutes), and a
/// continuous failure-rate term. Pure and total.
pub fn compute_score(features: &AnomalyFeatures) -> f64 {
    let mut score = 0.0;

    if features.address_frequency > 10 {
        score += 0.35;
    } else if features.address_frequency > 5 {
        score += 0.20;
    } else if features.address_frequency > 3 {
        score += 0.10;
    }

    if features.username_variety > 5 {
        score += 0.30;
    } else if features.username_variety > 3 {
        score += 0.15;
    }

    if features.time_spread_minutes < 2.0 && features.address_frequency > 3 {
        score += 0.25;
    }

    score += features.failure_rate * 0.35;

    score.min(1.0).clamp(0.0, 1.0)
}

/// Classify a score into a tier.
pub fn risk_level(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Block decision: high tier blocks, everything else passes through.
pub fn should_block(score: f64) -> bool {
    score >= HIGH_RISK_THRESHOLD
}
