//! Credentials and bearer tokens
//!
//! Argon2 password hashing/verification and HS256 bearer tokens bound
//! to `{subject id, username}`. Plaintext passwords are never logged
//! and never appear in errors.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::User;

/// Token payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Expiration timestamp
    pub exp: usize,
    /// Issued at
    pub iat: usize,
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored hash.
///
/// A mismatch is an `Ok(false)`, not an error; only a corrupt stored
/// hash is surfaced as a failure.
pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal("invalid stored password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Mint a signed bearer token for an authenticated user.
pub fn generate_token(user: &User, secret: &str, lifetime_hours: i64) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(lifetime_hours);

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Validate signature and expiry. Bad signature, expiry, and malformed
/// payloads all collapse into the same `TokenInvalid`.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::TokenInvalid)?;
    Ok(data.claims)
}
