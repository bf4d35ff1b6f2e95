//! Login Sentinel
//!
//! Risk-scored authentication backend. Every login request is rate
//! checked, scored against the requester's recent history in the
//! attempt ledger, gated, credential checked, and recorded:
//!
//! ```text
//! request -> rate limiter -> feature extractor -> scorer -> gate
//!                                |                            |
//!                          attempt ledger  <---- outcome write +
//!                                                credential check
//! ```
//!
//! The router is assembled here rather than in `main` so integration
//! tests can drive the full HTTP surface against an in-memory ledger.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod risk;
pub mod storage;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

use ratelimit::FixedWindowLimiter;
use storage::Ledger;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: Arc<dyn Ledger>,
    pub login_limiter: Arc<FixedWindowLimiter>,
    pub api_limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    /// Wire up state from a config and a ledger implementation. Each
    /// state owns its own limiter instances; nothing is process-global.
    pub fn new(config: Config, ledger: Arc<dyn Ledger>) -> Self {
        let login_limiter = Arc::new(FixedWindowLimiter::new(config.login_limiter()));
        let api_limiter = Arc::new(FixedWindowLimiter::new(config.api_limiter()));
        Self {
            config,
            ledger,
            login_limiter,
            api_limiter,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Public API routes; the login limiter is applied inside the login
    // pipeline itself.
    let api_public = Router::new()
        .route("/api/login", post(handlers::auth::login))
        .route("/api/register", post(handlers::auth::register));

    // Read endpoints require a bearer token.
    let api_protected = Router::new()
        .route("/api/login-attempts", get(handlers::attempts::list))
        .route("/api/anomaly-stats", get(handlers::attempts::anomaly_stats))
        .route("/api/metrics", get(handlers::attempts::metrics))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Everything under /api counts against the API limiter.
    let api = api_public.merge(api_protected).layer(
        axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::api_rate_limit,
        ),
    );

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
