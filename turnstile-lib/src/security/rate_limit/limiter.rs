//! Per-category rate limit evaluator.
//!
//! This module combines the [`WindowStore`] with the [`PolicyTable`] and turns
//! store admissions into [`RateLimitDecision`]s.

use std::time::{Duration, SystemTime};

use super::store::{Admission, WindowStore};
use super::{Category, Policy, PolicyTable};
use crate::config::RateLimitConfig;
use crate::error::Result;

/// Reason attached to every limited decision.
pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

/// Result of a rate limit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed to proceed.
    Allowed {
        /// Number of requests remaining in the current window
        remaining: u32,
        /// When the current window closes
        reset_at: SystemTime,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// When the current window closes and requests are accepted again
        reset_at: SystemTime,
    },
}

impl RateLimitDecision {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Returns true if the request is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitDecision::Limited { .. })
    }

    /// Get the remaining count (always 0 when limited).
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitDecision::Allowed { remaining, .. } => *remaining,
            RateLimitDecision::Limited { .. } => 0,
        }
    }

    /// Get the time the current window closes.
    pub fn reset_at(&self) -> SystemTime {
        match self {
            RateLimitDecision::Allowed { reset_at, .. } => *reset_at,
            RateLimitDecision::Limited { reset_at } => *reset_at,
        }
    }

    /// Denial reason, if limited.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            RateLimitDecision::Limited { .. } => Some(RATE_LIMIT_EXCEEDED),
            RateLimitDecision::Allowed { .. } => None,
        }
    }

    /// Time left until the window resets, if limited.
    pub fn retry_after(&self, now: SystemTime) -> Option<Duration> {
        match self {
            RateLimitDecision::Limited { reset_at } => {
                Some(reset_at.duration_since(now).unwrap_or_default())
            }
            RateLimitDecision::Allowed { .. } => None,
        }
    }
}

/// Key of one counter: a client identity within one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub identity: String,
    pub category: Category,
}

impl WindowKey {
    pub fn new(identity: impl Into<String>, category: Category) -> Self {
        Self { identity: identity.into(), category }
    }
}

/// A fixed-window rate limiter with one independent quota per category.
///
/// # Fixed windows
///
/// Each `(identity, category)` pair gets a window that opens on its first
/// request and closes `window` later. A request arriving exactly at the reset
/// time opens the next window. Because windows do not slide, a client can send
/// up to `2 × max_requests` in a short span straddling a boundary; callers
/// must not rely on a tighter bound.
///
/// # Example
/// ```ignore
/// use std::time::SystemTime;
/// use turnstile_lib::security::rate_limit::{Category, PolicyTable, RateLimiter};
///
/// let limiter = RateLimiter::new(PolicyTable::default());
/// let decision = limiter.evaluate("1.2.3.4|Mozilla/5.0", Category::Auth, SystemTime::now());
/// if decision.is_limited() {
///     // reply 429
/// }
/// ```
pub struct RateLimiter {
    store: WindowStore<WindowKey>,
    policies: PolicyTable,
}

impl RateLimiter {
    /// Create a limiter with a default-sized store.
    pub fn new(policies: PolicyTable) -> Self {
        Self { store: WindowStore::default(), policies }
    }

    /// Create a limiter over an explicitly sized store.
    pub fn with_store(policies: PolicyTable, store: WindowStore<WindowKey>) -> Self {
        Self { store, policies }
    }

    /// Build the policy table and store from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let policies = PolicyTable::from_config(config)?;
        let store = WindowStore::new(config.shards, config.max_keys);
        Ok(Self::with_store(policies, store))
    }

    /// Record a request for `identity` in `category` and decide whether it may proceed.
    ///
    /// Denied requests are not counted; allowed requests are counted before
    /// this returns and are never rolled back.
    pub fn evaluate(&self, identity: &str, category: Category, now: SystemTime) -> RateLimitDecision {
        let policy = self.policies.get(category);
        let key = WindowKey::new(identity, category);

        match self.store.admit(key, policy.max_requests, policy.window, now) {
            Admission::Admitted { count, reset_at } => RateLimitDecision::Allowed {
                remaining: policy.max_requests.saturating_sub(count),
                reset_at,
            },
            Admission::Rejected { reset_at, .. } => RateLimitDecision::Limited { reset_at },
        }
    }

    /// [`RateLimiter::evaluate`] at the current wall-clock time.
    pub fn check(&self, identity: &str, category: Category) -> RateLimitDecision {
        self.evaluate(identity, category, SystemTime::now())
    }

    /// Report what [`RateLimiter::evaluate`] would decide, without recording the request.
    pub fn peek(&self, identity: &str, category: Category, now: SystemTime) -> RateLimitDecision {
        let policy = self.policies.get(category);
        let key = WindowKey::new(identity, category);

        match self.store.get(&key, now) {
            Some(record) if record.count >= policy.max_requests => {
                RateLimitDecision::Limited { reset_at: record.reset_at }
            }
            Some(record) => RateLimitDecision::Allowed {
                remaining: policy.max_requests.saturating_sub(record.count),
                reset_at: record.reset_at,
            },
            None => RateLimitDecision::Allowed {
                remaining: policy.max_requests,
                reset_at: now.checked_add(policy.window).unwrap_or(now),
            },
        }
    }

    /// Policy applied to `category`.
    pub fn policy(&self, category: Category) -> Policy {
        self.policies.get(category)
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Drop all windows that have ended. Returns the number removed.
    pub fn sweep_expired(&self, now: SystemTime) -> usize {
        self.store.sweep_expired(now)
    }

    /// Number of `(identity, category)` windows currently stored.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}
