//! Fixed-window rate limiting
//!
//! Per-address counters that reset on window rollover. No smoothing:
//! a burst up to `max_requests` passes instantly at window start.
//! Counters live in a `DashMap`, so updates on the same address are
//! serialized by the entry lock while distinct addresses never
//! contend. Single-process state only.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Limiter settings, one per limiter instance.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
    /// Load-test switch: when false, counters are neither consulted
    /// nor mutated and every request passes.
    pub enabled: bool,
}

#[derive(Debug)]
struct WindowCounter {
    count: u32,
    window_start: Instant,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over the limit; retry after the remaining window time.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }
}

/// Fixed-window limiter keyed by client address.
///
/// Constructor-injected rather than global so tests can run isolated
/// instances with short windows.
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    counters: DashMap<String, WindowCounter>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            counters: DashMap::new(),
        }
    }

    /// Count one request from `address` against the current window.
    pub fn check(&self, address: &str) -> RateDecision {
        self.check_at(address, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock, used by
    /// tests to drive window rollover without sleeping.
    pub fn check_at(&self, address: &str, now: Instant) -> RateDecision {
        if !self.config.enabled {
            return RateDecision::Allowed;
        }

        let mut entry = self
            .counters
            .entry(address.to_string())
            .or_insert_with(|| WindowCounter {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count > self.config.max_requests {
            let elapsed = now.duration_since(entry.window_start);
            let retry_after = self.config.window.saturating_sub(elapsed);
            return RateDecision::Limited { retry_after };
        }

        RateDecision::Allowed
    }

    /// Drop counters whose window has fully elapsed. Rollover already
    /// makes stale counters harmless; this only bounds memory in
    /// long-running processes.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.counters
            .retain(|_, c| now.duration_since(c.window_start) < window);
    }

    /// Number of live counters, for diagnostics.
    pub fn tracked_addresses(&self) -> usize {
        self.counters.len()
    }
}
