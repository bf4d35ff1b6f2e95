//! Attempt history and detection metrics handlers
//!
//! All routes here sit behind the bearer-token middleware.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::auth::UserContext;
use crate::models::{AnomalyStats, LoginAttempt};
use crate::{AppResult, AppState};

/// Default page size for the attempt list.
const DEFAULT_LIMIT: i64 = 100;

/// Lookback for the metrics rollup, in minutes (24 hours).
const METRICS_WINDOW_MINUTES: i64 = 1440;

#[derive(Debug, Deserialize)]
pub struct AttemptsQuery {
    pub limit: Option<i64>,
}

/// GET /api/login-attempts - recent attempts, newest first.
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<AttemptsQuery>,
) -> AppResult<Json<Vec<LoginAttempt>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000);
    tracing::debug!("attempt history requested by '{}'", user.username);
    let attempts = state.ledger.recent_attempts(limit).await?;
    Ok(Json(attempts))
}

/// GET /api/anomaly-stats - detection stats over failed attempts.
pub async fn anomaly_stats(State(state): State<AppState>) -> AppResult<Json<AnomalyStats>> {
    let stats = state.ledger.anomaly_stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub anomaly_detection_rate: f64,
    pub total_anomalies: i64,
    pub detected_anomalies: i64,
    /// Successful logins in the metrics window.
    pub active_sessions: i64,
    /// Blocked logins in the metrics window.
    pub threats_blocked: i64,
}

/// GET /api/metrics - dashboard rollup over the last 24 hours.
pub async fn metrics(State(state): State<AppState>) -> AppResult<Json<MetricsResponse>> {
    let stats = state.ledger.anomaly_stats().await?;
    let recent = state.ledger.attempts_since(METRICS_WINDOW_MINUTES).await?;

    let active_sessions = recent.iter().filter(|a| a.success).count() as i64;
    let threats_blocked = recent.iter().filter(|a| a.blocked).count() as i64;

    Ok(Json(MetricsResponse {
        anomaly_detection_rate: stats.detection_rate,
        total_anomalies: stats.total,
        detected_anomalies: stats.detected,
        active_sessions,
        threats_blocked,
    }))
}
