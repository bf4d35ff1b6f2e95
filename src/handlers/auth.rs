//! Login and registration handlers
//!
//! The login pipeline runs rate check, feature extraction, scoring,
//! and the decision gate before credentials are consulted, and writes
//! exactly one attempt record per scored request before responding.
//! Blocking is independent of password validity: credential-stuffing
//! with correct passwords must still be stopped.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use validator::Validate;

use crate::auth::generate_token;
use crate::error::AppJson;
use crate::middleware::client_address;
use crate::models::{
    LoginRequest, LoginResponse, NewLoginAttempt, RegisterRequest, RegisterResponse,
};
use crate::ratelimit::RateDecision;
use crate::risk;
use crate::{AppError, AppResult, AppState};

/// Login endpoint.
///
/// Rejected rate-limited requests never reach the scorer and leave no
/// ledger record. Every request past that point is recorded with its
/// score and outcome, whether it succeeds, fails, or is blocked.
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    req.validate()?;

    let address = client_address(&headers, connect_info.map(|ci| ci.0));
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let RateDecision::Limited { retry_after } = state.login_limiter.check(&address) {
        tracing::warn!("login rate limit exceeded for {}", address);
        return Err(AppError::RateLimited {
            retry_after_secs: retry_after.as_secs(),
        });
    }

    let risk_score =
        risk::calculate_risk_score(state.ledger.as_ref(), &req.username, &address).await?;
    let blocked = risk::should_block(risk_score);

    // Credentials are checked even when the gate already decided to
    // block, so the recorded success flag reflects password validity.
    let user = state.ledger.find_user_by_username(&req.username).await?;
    let password_valid = match &user {
        Some(user) => crate::auth::verify_password(&req.password, &user.password_hash)?,
        None => false,
    };

    let success = password_valid && !blocked;

    state
        .ledger
        .record_attempt(NewLoginAttempt {
            username: req.username.clone(),
            address: address.clone(),
            user_agent,
            location: Some("Unknown".to_string()),
            risk_score,
            success,
            blocked,
        })
        .await?;

    if blocked {
        tracing::warn!(
            "blocked login for '{}' from {} (risk {:.2})",
            req.username,
            address,
            risk_score
        );
        return Err(AppError::Blocked { risk_score });
    }

    let Some(user) = user.filter(|_| password_valid) else {
        return Err(AppError::InvalidCredentials {
            risk_score: Some(risk_score),
        });
    };

    let token = generate_token(
        &user,
        &state.config.session_secret,
        state.config.token_lifetime_hours as i64,
    )?;

    tracing::info!(
        "login succeeded for '{}' from {} (risk {:.2})",
        user.username,
        address,
        risk_score
    );

    Ok(Json(LoginResponse {
        user: user.to_info(),
        token,
        risk_score,
    }))
}

/// Register a new user and hand back a token.
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    req.validate()?;

    if state
        .ledger
        .find_user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyExists("Username already exists".to_string()));
    }

    let password_hash = crate::auth::hash_password(&req.password)?;
    let user = state
        .ledger
        .create_user(&req.username, &password_hash)
        .await?;

    let token = generate_token(
        &user,
        &state.config.session_secret,
        state.config.token_lifetime_hours as i64,
    )?;

    tracing::info!("user '{}' registered", user.username);

    Ok(Json(RegisterResponse {
        user: user.to_info(),
        token,
    }))
}
