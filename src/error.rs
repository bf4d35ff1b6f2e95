//! Error handling
//!
//! One boundary error type for the whole pipeline. Responses never
//! reveal which scoring rule fired, whether a username exists, or why
//! a token failed verification.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request body; carries per-field details.
    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    /// Body that failed to deserialize at all: missing fields, wrong
    /// types, or unparseable JSON.
    #[error("malformed request body")]
    MalformedBody(String),

    /// Over the fixed-window budget; retry after the remaining window.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// Wrong password or unknown user. The risk score is included when
    /// the request was scored before credentials were checked.
    #[error("invalid credentials")]
    InvalidCredentials { risk_score: Option<f64> },

    /// High-risk login rejected regardless of credential validity.
    #[error("login blocked")]
    Blocked { risk_score: f64 },

    /// Missing or malformed Authorization header.
    #[error("authentication required")]
    Unauthorized,

    /// Bad signature, expired, or malformed token. Indistinguishable
    /// to the caller by design.
    #[error("invalid token")]
    TokenInvalid,

    #[error("{0}")]
    AlreadyExists(String),

    /// Ledger read/write failure. Fails the request closed; a storage
    /// outage must not pass as a low-risk login.
    #[error("storage unavailable: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid input", "details": errors }),
            ),
            AppError::MalformedBody(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid input", "details": details }),
            ),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "Too many login attempts",
                    "message": "Please try again later",
                    "retryAfter": retry_after_secs,
                }),
            ),
            AppError::InvalidCredentials { risk_score } => {
                let mut body = json!({ "error": "Invalid credentials" });
                if let Some(score) = risk_score {
                    body["riskScore"] = json!(score);
                }
                (StatusCode::UNAUTHORIZED, body)
            }
            AppError::Blocked { risk_score } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "Login blocked",
                    "message": "High risk login detected",
                    "riskScore": risk_score,
                }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "No token provided" }),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid or expired token" }),
            ),
            AppError::AlreadyExists(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::Storage(msg) => {
                tracing::error!("storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// JSON extractor whose rejections speak the same error contract as
/// the rest of the API: a body that cannot be deserialized becomes a
/// 400 with details instead of axum's plain-text 422.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::TokenInvalid
    }
}
