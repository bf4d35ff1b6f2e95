//! API-wide rate limit middleware
//!
//! Fronts every /api route with the API limiter. The stricter login
//! limiter is applied separately inside the login pipeline, where the
//! client address is already resolved.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::ratelimit::RateDecision;
use crate::{AppError, AppState};

use super::client_address;

pub async fn api_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let address = client_address(req.headers(), peer);

    if let RateDecision::Limited { retry_after } = state.api_limiter.check(&address) {
        tracing::warn!("API rate limit exceeded for {}", address);
        return Err(AppError::RateLimited {
            retry_after_secs: retry_after.as_secs(),
        });
    }

    Ok(next.run(req).await)
}
