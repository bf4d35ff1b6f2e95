//! Postgres ledger

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{AnomalyStats, LoginAttempt, NewLoginAttempt, User};
use crate::risk::HIGH_RISK_THRESHOLD;
use crate::AppResult;

use super::{detection_rate, Ledger};

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn record_attempt(&self, attempt: NewLoginAttempt) -> AppResult<LoginAttempt> {
        let record = sqlx::query_as::<_, LoginAttempt>(
            r#"
            INSERT INTO login_attempts
                (username, address, user_agent, location, risk_score, success, blocked)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&attempt.username)
        .bind(&attempt.address)
        .bind(&attempt.user_agent)
        .bind(&attempt.location)
        .bind(attempt.risk_score)
        .bind(attempt.success)
        .bind(attempt.blocked)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn recent_attempts(&self, limit: i64) -> AppResult<Vec<LoginAttempt>> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            "SELECT * FROM login_attempts ORDER BY timestamp DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn attempts_by_username(
        &self,
        username: &str,
        limit: i64,
    ) -> AppResult<Vec<LoginAttempt>> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT * FROM login_attempts
            WHERE username = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(username)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn attempts_by_address(
        &self,
        address: &str,
        window_minutes: i64,
    ) -> AppResult<Vec<LoginAttempt>> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT * FROM login_attempts
            WHERE address = $1
              AND timestamp >= NOW() - ($2 * INTERVAL '1 minute')
            ORDER BY timestamp DESC
            "#,
        )
        .bind(address)
        .bind(window_minutes as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn attempts_since(&self, window_minutes: i64) -> AppResult<Vec<LoginAttempt>> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT * FROM login_attempts
            WHERE timestamp >= NOW() - ($1 * INTERVAL '1 minute')
            ORDER BY timestamp DESC
            "#,
        )
        .bind(window_minutes as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn anomaly_stats(&self) -> AppResult<AnomalyStats> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE success = false")
                .fetch_one(&self.pool)
                .await?;

        let detected: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_attempts WHERE success = false AND risk_score >= $1",
        )
        .bind(HIGH_RISK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        Ok(AnomalyStats {
            total,
            detected,
            detection_rate: detection_rate(total, detected),
        })
    }
}
