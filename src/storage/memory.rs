//! In-memory ledger
//!
//! Backs tests and local development. Same query semantics as the
//! Postgres ledger, including newest-first ordering on the bounded
//! queries.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AnomalyStats, LoginAttempt, NewLoginAttempt, User};
use crate::risk::HIGH_RISK_THRESHOLD;
use crate::AppResult;

use super::{detection_rate, Ledger};

#[derive(Default)]
pub struct MemoryLedger {
    users: Mutex<HashMap<String, User>>,
    attempts: Mutex<Vec<LoginAttempt>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt with an explicit timestamp. Tests use this to
    /// shape history without sleeping.
    pub async fn record_attempt_at(
        &self,
        attempt: NewLoginAttempt,
        timestamp: DateTime<Utc>,
    ) -> AppResult<LoginAttempt> {
        let record = LoginAttempt {
            id: Uuid::new_v4(),
            username: attempt.username,
            address: attempt.address,
            user_agent: attempt.user_agent,
            location: attempt.location,
            risk_score: attempt.risk_score,
            success: attempt.success,
            blocked: attempt.blocked,
            timestamp,
        };
        self.attempts
            .lock()
            .map_err(|_| AppError::Storage("attempt store poisoned".to_string()))?
            .push(record.clone());
        Ok(record)
    }

    fn attempts_snapshot(&self) -> AppResult<Vec<LoginAttempt>> {
        Ok(self
            .attempts
            .lock()
            .map_err(|_| AppError::Storage("attempt store poisoned".to_string()))?
            .clone())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self
            .users
            .lock()
            .map_err(|_| AppError::Storage("user store poisoned".to_string()))?;
        Ok(users.get(username).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<User> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AppError::Storage("user store poisoned".to_string()))?;
        if users.contains_key(username) {
            return Err(AppError::AlreadyExists("Username already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    async fn record_attempt(&self, attempt: NewLoginAttempt) -> AppResult<LoginAttempt> {
        self.record_attempt_at(attempt, Utc::now()).await
    }

    async fn recent_attempts(&self, limit: i64) -> AppResult<Vec<LoginAttempt>> {
        let mut attempts = self.attempts_snapshot()?;
        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit.max(0) as usize);
        Ok(attempts)
    }

    async fn attempts_by_username(
        &self,
        username: &str,
        limit: i64,
    ) -> AppResult<Vec<LoginAttempt>> {
        let mut attempts: Vec<_> = self
            .attempts_snapshot()?
            .into_iter()
            .filter(|a| a.username == username)
            .collect();
        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit.max(0) as usize);
        Ok(attempts)
    }

    async fn attempts_by_address(
        &self,
        address: &str,
        window_minutes: i64,
    ) -> AppResult<Vec<LoginAttempt>> {
        let threshold = Utc::now() - Duration::minutes(window_minutes);
        Ok(self
            .attempts_snapshot()?
            .into_iter()
            .filter(|a| a.address == address && a.timestamp >= threshold)
            .collect())
    }

    async fn attempts_since(&self, window_minutes: i64) -> AppResult<Vec<LoginAttempt>> {
        let threshold = Utc::now() - Duration::minutes(window_minutes);
        Ok(self
            .attempts_snapshot()?
            .into_iter()
            .filter(|a| a.timestamp >= threshold)
            .collect())
    }

    async fn anomaly_stats(&self) -> AppResult<AnomalyStats> {
        let attempts = self.attempts_snapshot()?;
        let failed: Vec<_> = attempts.iter().filter(|a| !a.success).collect();
        let total = failed.len() as i64;
        let detected = failed
            .iter()
            .filter(|a| a.risk_score >= HIGH_RISK_THRESHOLD)
            .count() as i64;
        Ok(AnomalyStats {
            total,
            detected,
            detection_rate: detection_rate(total, detected),
        })
    }
}
