//! Login attempt model
//!
//! One record per login call that reaches the scorer, regardless of
//! outcome. Records are append-only: the risk pipeline reads them but
//! never mutates or deletes them.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttempt {
    pub id: Uuid,
    pub username: String,
    pub address: String,
    pub user_agent: Option<String>,
    pub location: Option<String>,
    /// Computed anomaly score, always in [0, 1].
    pub risk_score: f64,
    pub success: bool,
    pub blocked: bool,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload; id and timestamp are assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub username: String,
    pub address: String,
    pub user_agent: Option<String>,
    pub location: Option<String>,
    pub risk_score: f64,
    pub success: bool,
    pub blocked: bool,
}

/// Aggregate detection stats over failed attempts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStats {
    /// Failed attempts overall.
    pub total: i64,
    /// Failed attempts that scored at or above the high-risk threshold.
    pub detected: i64,
    /// 100 * detected / total, 0 when there are no failed attempts.
    pub detection_rate: f64,
}
