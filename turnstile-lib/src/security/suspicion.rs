//! Heuristic detection of automated traffic.
//!
//! Runs independently of category quotas. Checks, first match wins:
//! 1. user agent missing or shorter than `min_user_agent_len`
//! 2. user agent contains a known automation-tool substring (case-insensitive)
//! 3. the identity sent more than `burst_threshold` requests in the burst window,
//!    counted across all categories in a store of its own

use std::fmt;
use std::time::{Duration, SystemTime};

use super::rate_limit::{Admission, WindowStore};
use super::request::ClientRequest;
use crate::config::SuspicionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspicionReason {
    MissingUserAgent,
    BotUserAgent,
    RapidRequests,
}

impl SuspicionReason {
    /// Human-readable reason, sent back to the client
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspicionReason::MissingUserAgent => "missing or suspicious user agent",
            SuspicionReason::BotUserAgent => "bot user-agent detected",
            SuspicionReason::RapidRequests => "rapid request pattern detected",
        }
    }

    /// Short label for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            SuspicionReason::MissingUserAgent => "missing_user_agent",
            SuspicionReason::BotUserAgent => "bot_user_agent",
            SuspicionReason::RapidRequests => "rapid_requests",
        }
    }
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspicionVerdict {
    Clean,
    Suspicious(SuspicionReason),
}

impl SuspicionVerdict {
    pub fn is_suspicious(&self) -> bool {
        matches!(self, SuspicionVerdict::Suspicious(_))
    }

    pub fn reason(&self) -> Option<SuspicionReason> {
        match self {
            SuspicionVerdict::Suspicious(reason) => Some(*reason),
            SuspicionVerdict::Clean => None,
        }
    }
}

pub struct SuspicionDetector {
    min_user_agent_len: usize,
    bot_patterns: Vec<String>,
    burst: WindowStore<String>,
    burst_threshold: u32,
    burst_window: Duration,
}

impl Default for SuspicionDetector {
    fn default() -> Self {
        Self::new(&SuspicionConfig::default())
    }
}

impl SuspicionDetector {
    pub fn new(config: &SuspicionConfig) -> Self {
        Self::with_store(config, WindowStore::default())
    }

    /// Detector whose burst counters live in `burst`.
    pub fn with_store(config: &SuspicionConfig, burst: WindowStore<String>) -> Self {
        Self {
            min_user_agent_len: config.min_user_agent_len,
            bot_patterns: config
                .bot_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            burst,
            burst_threshold: config.burst_threshold,
            burst_window: Duration::from_secs(config.burst_window_secs),
        }
    }

    /// Inspect one request from `identity` at `now`.
    ///
    /// Only requests that pass both user-agent checks are counted in the burst window.
    pub fn check(&self, req: &ClientRequest<'_>, identity: &str, now: SystemTime) -> SuspicionVerdict {
        let user_agent = match req.user_agent() {
            Some(ua) if ua.chars().count() >= self.min_user_agent_len => ua,
            _ => return SuspicionVerdict::Suspicious(SuspicionReason::MissingUserAgent),
        };

        if self.is_bot(&user_agent) {
            return SuspicionVerdict::Suspicious(SuspicionReason::BotUserAgent);
        }

        match self
            .burst
            .admit(identity.to_string(), self.burst_threshold, self.burst_window, now)
        {
            Admission::Admitted { .. } => SuspicionVerdict::Clean,
            Admission::Rejected { .. } => SuspicionVerdict::Suspicious(SuspicionReason::RapidRequests),
        }
    }

    fn is_bot(&self, user_agent: &str) -> bool {
        let user_agent = user_agent.to_lowercase();
        self.bot_patterns
            .iter()
            .any(|pattern| user_agent.contains(pattern.as_str()))
    }

    /// Drop burst windows that have ended. Returns the number removed.
    pub fn sweep_expired(&self, now: SystemTime) -> usize {
        self.burst.sweep_expired(now)
    }

    pub fn burst_store(&self) -> &WindowStore<String> {
        &self.burst
    }

    /// Number of identities with a burst window held in memory.
    pub fn tracked_identities(&self) -> usize {
        self.burst.len()
    }
}
