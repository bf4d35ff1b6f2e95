//! Bearer token middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::header::AUTHORIZATION,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::verify_token;
use crate::{AppError, AppState};

/// Authenticated caller, extracted from a verified token.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub username: String,
}

/// Middleware: require a valid bearer token.
///
/// A missing or malformed Authorization header is rejected before any
/// verification runs; signature, expiry, and payload failures are all
/// reported as the same invalid-token error.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;

    let claims = verify_token(&token, &state.config.session_secret)?;

    let user_ctx = UserContext {
        user_id: Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?,
        username: claims.username,
    };

    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::Unauthorized);
    }

    Ok(auth_header[7..].to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
