//! Per-identifier submission throttle.
//!
//! Identifiers are self-reported (email, IC number or the anonymous bucket) and trivially
//! rotated, so this is a speed bump against scripted resubmission rather than a security
//! control. Nothing should rely on it to stop a determined client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use super::clock::Clock;

/// Identifier used when the applicant has not supplied an email or IC number yet.
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// Ceiling and lockout windows for submission attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
    pub block_duration: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window: Duration::minutes(15),
            block_duration: Duration::minutes(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttemptEntry {
    count: u32,
    last_attempt: DateTime<Utc>,
    blocked: bool,
}

impl AttemptEntry {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            last_attempt: now,
            blocked: false,
        }
    }
}

pub struct RateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    attempts: Mutex<HashMap<String, AttemptEntry>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record an attempt for `identifier` and report whether it may go ahead.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock().expect("rate limiter mutex poisoned");

        let Some(entry) = attempts.get_mut(identifier) else {
            attempts.insert(identifier.to_string(), AttemptEntry::fresh(now));
            return true;
        };

        let elapsed = now - entry.last_attempt;
        if entry.blocked && elapsed < self.policy.block_duration {
            return false;
        }

        if elapsed > self.policy.window {
            *entry = AttemptEntry::fresh(now);
            return true;
        }

        if entry.count < self.policy.max_attempts {
            entry.count += 1;
            entry.last_attempt = now;
            return true;
        }

        entry.blocked = true;
        entry.last_attempt = now;
        false
    }

    /// Time left on the active lockout, or on the tracking window when not blocked.
    pub fn remaining_time(&self, identifier: &str) -> Duration {
        let attempts = self.attempts.lock().expect("rate limiter mutex poisoned");
        let Some(entry) = attempts.get(identifier) else {
            return Duration::zero();
        };

        let elapsed = self.clock.now() - entry.last_attempt;
        let wait = if entry.blocked {
            self.policy.block_duration
        } else {
            self.policy.window
        };
        (wait - elapsed).max(Duration::zero())
    }

    /// Drop entries idle for longer than the block duration. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock().expect("rate limiter mutex poisoned");
        let before = attempts.len();
        attempts.retain(|_, entry| now - entry.last_attempt <= self.policy.block_duration);
        before - attempts.len()
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.attempts
            .lock()
            .expect("rate limiter mutex poisoned")
            .len()
    }
}
