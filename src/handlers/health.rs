//! Health check handler
//!
//! Public liveness probe. Reports whether the attempt ledger answers
//! a trivial read, and how many addresses the limiters are currently
//! tracking, so a flat dashboard poll shows storage trouble before
//! logins start failing with 500s.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    ledger: &'static str,
    tracked_addresses: usize,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger_ok = state.ledger.recent_attempts(1).await.is_ok();

    Json(HealthResponse {
        status: if ledger_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        ledger: if ledger_ok { "reachable" } else { "unreachable" },
        tracked_addresses: state.login_limiter.tracked_addresses()
            + state.api_limiter.tracked_addresses(),
    })
}
