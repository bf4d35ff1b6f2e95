//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::hash_password;
use crate::storage::Ledger;
use crate::AppResult;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;
    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Seed an admin account from `ADMIN_USERNAME`/`ADMIN_PASSWORD` when
/// both are set and the user does not already exist.
pub async fn seed_admin(ledger: &dyn Ledger) -> AppResult<()> {
    let (Ok(username), Ok(password)) = (
        std::env::var("ADMIN_USERNAME"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    if ledger.find_user_by_username(&username).await?.is_some() {
        tracing::info!("Admin account '{}' already exists", username);
        return Ok(());
    }

    let password_hash = hash_password(&password)?;
    ledger.create_user(&username, &password_hash).await?;
    tracing::info!("Admin account '{}' created", username);
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Users
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Login attempts (append-only)
CREATE TABLE IF NOT EXISTS login_attempts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(255) NOT NULL,
    address VARCHAR(64) NOT NULL,
    user_agent TEXT,
    location VARCHAR(255),
    risk_score DOUBLE PRECISION NOT NULL,
    success BOOLEAN NOT NULL,
    blocked BOOLEAN NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_attempts_address_time ON login_attempts(address, timestamp);
CREATE INDEX IF NOT EXISTS idx_attempts_username_time ON login_attempts(username, timestamp);
CREATE INDEX IF NOT EXISTS idx_attempts_time ON login_attempts(timestamp);
"#;
