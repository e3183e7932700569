//! The per-request entry point combining identity, suspicion and quota checks.

use std::time::SystemTime;
use tracing::debug;

use super::identity::IdentityResolver;
use super::rate_limit::{Category, Policy, PolicyTable, RateLimitDecision, RateLimiter, WindowStore};
use super::request::ClientRequest;
use super::suspicion::{SuspicionDetector, SuspicionReason, SuspicionVerdict};
use crate::config::{Config, SuspicionAction};
use crate::error::Result;

/// Outcome of [`Guard::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Forward the request.
    ///
    /// `decision` is `None` when rate limiting is disabled. `flagged` carries a
    /// suspicion reason that was only logged because the action is `log`.
    Pass {
        identity: String,
        category: Category,
        policy: Policy,
        decision: Option<RateLimitDecision>,
        flagged: Option<SuspicionReason>,
    },
    /// The category quota is used up for this window.
    RateLimited {
        identity: String,
        category: Category,
        policy: Policy,
        decision: RateLimitDecision,
    },
    /// The request looks automated and the configured action is `deny`.
    Suspicious { identity: String, category: Category, reason: SuspicionReason },
}

impl GuardVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, GuardVerdict::Pass { .. })
    }

    pub fn identity(&self) -> &str {
        match self {
            GuardVerdict::Pass { identity, .. }
            | GuardVerdict::RateLimited { identity, .. }
            | GuardVerdict::Suspicious { identity, .. } => identity,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            GuardVerdict::Pass { category, .. }
            | GuardVerdict::RateLimited { category, .. }
            | GuardVerdict::Suspicious { category, .. } => *category,
        }
    }

    /// Reason string for a denial, `None` when passing.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            GuardVerdict::Pass { .. } => None,
            GuardVerdict::RateLimited { decision, .. } => decision.reason(),
            GuardVerdict::Suspicious { reason, .. } => Some(reason.as_str()),
        }
    }
}

/// Rate limit evaluation for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitCheck {
    pub identity: String,
    pub policy: Policy,
    pub decision: RateLimitDecision,
}

/// Number of records removed by one [`Guard::sweep_expired`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub windows: usize,
    pub bursts: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.windows.saturating_add(self.bursts)
    }
}

/// Process-wide request guard, shared by every connection.
pub struct Guard {
    limiter: RateLimiter,
    detector: Option<SuspicionDetector>,
    resolver: IdentityResolver,
    suspicion_action: SuspicionAction,
    rate_limit_enabled: bool,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(
            RateLimiter::new(PolicyTable::default()),
            Some(SuspicionDetector::default()),
            IdentityResolver::default(),
        )
    }
}

impl Guard {
    pub fn new(
        limiter: RateLimiter,
        detector: Option<SuspicionDetector>,
        resolver: IdentityResolver,
    ) -> Self {
        Self {
            limiter,
            detector,
            resolver,
            suspicion_action: SuspicionAction::Deny,
            rate_limit_enabled: true,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let limiter = RateLimiter::from_config(&config.rate_limit)?;
        // burst counters are keyed by the same identities, so they get the same sizing
        let detector = config.suspicion.enabled.then(|| {
            let burst = WindowStore::new(config.rate_limit.shards, config.rate_limit.max_keys);
            SuspicionDetector::with_store(&config.suspicion, burst)
        });

        Ok(Self {
            limiter,
            detector,
            resolver: IdentityResolver::new(&config.identity),
            suspicion_action: config.suspicion.action,
            rate_limit_enabled: config.rate_limit.enabled,
        })
    }

    pub fn with_suspicion_action(mut self, action: SuspicionAction) -> Self {
        self.suspicion_action = action;
        self
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn detector(&self) -> Option<&SuspicionDetector> {
        self.detector.as_ref()
    }

    /// Identity used for quotas: a non-empty override verbatim, else header-derived.
    pub fn identity_for(&self, req: &ClientRequest<'_>, identity_override: Option<&str>) -> String {
        match identity_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(identity) => identity.to_string(),
            None => self.resolver.resolve(req),
        }
    }

    /// Count the request against the quota of `category` and decide.
    pub fn check_rate_limit(
        &self,
        req: &ClientRequest<'_>,
        category: Category,
        identity_override: Option<&str>,
        now: SystemTime,
    ) -> RateLimitCheck {
        let identity = self.identity_for(req, identity_override);
        let decision = self.limiter.evaluate(&identity, category, now);
        RateLimitCheck { policy: self.limiter.policy(category), identity, decision }
    }

    /// Run the suspicion heuristics under the identity [`Guard::identity_for`]
    /// picks, so the burst counter is shared with [`Guard::inspect_at`].
    ///
    /// Always [`SuspicionVerdict::Clean`] when detection is disabled.
    pub fn check_suspicious_activity(
        &self,
        req: &ClientRequest<'_>,
        identity_override: Option<&str>,
        now: SystemTime,
    ) -> SuspicionVerdict {
        let identity = self.identity_for(req, identity_override);
        self.suspicion_for(req, &identity, now)
    }

    fn suspicion_for(&self, req: &ClientRequest<'_>, identity: &str, now: SystemTime) -> SuspicionVerdict {
        match &self.detector {
            Some(detector) => detector.check(req, identity, now),
            None => SuspicionVerdict::Clean,
        }
    }

    /// [`Guard::inspect_at`] at the current wall-clock time.
    pub fn inspect(
        &self,
        req: &ClientRequest<'_>,
        category: Category,
        identity_override: Option<&str>,
    ) -> GuardVerdict {
        self.inspect_at(req, category, identity_override, SystemTime::now())
    }

    /// Full check for one request: suspicion first, then the category quota.
    ///
    /// A request denied as suspicious is not counted against its quota.
    pub fn inspect_at(
        &self,
        req: &ClientRequest<'_>,
        category: Category,
        identity_override: Option<&str>,
        now: SystemTime,
    ) -> GuardVerdict {
        let identity = self.identity_for(req, identity_override);
        let policy = self.limiter.policy(category);

        let flagged = match self.suspicion_for(req, &identity, now) {
            SuspicionVerdict::Suspicious(reason) if self.suspicion_action == SuspicionAction::Deny => {
                return GuardVerdict::Suspicious { identity, category, reason };
            }
            verdict => verdict.reason(),
        };

        if !self.rate_limit_enabled {
            return GuardVerdict::Pass { identity, category, policy, decision: None, flagged };
        }

        let decision = self.limiter.evaluate(&identity, category, now);
        debug!(
            category = %category,
            remaining = decision.remaining(),
            allowed = decision.is_allowed(),
            "Rate limit evaluated"
        );

        if decision.is_limited() {
            GuardVerdict::RateLimited { identity, category, policy, decision }
        } else {
            GuardVerdict::Pass { identity, category, policy, decision: Some(decision), flagged }
        }
    }

    /// Reclaim expired quota windows and burst counters.
    pub fn sweep_expired(&self, now: SystemTime) -> SweepStats {
        SweepStats {
            windows: self.limiter.sweep_expired(now),
            bursts: self
                .detector
                .as_ref()
                .map(|d| d.sweep_expired(now))
                .unwrap_or_default(),
        }
    }

    /// Live records across the quota store and the burst store.
    pub fn tracked_keys(&self) -> usize {
        let bursts = self
            .detector
            .as_ref()
            .map(SuspicionDetector::tracked_identities)
            .unwrap_or_default();
        self.limiter.tracked_keys().saturating_add(bursts)
    }
}
