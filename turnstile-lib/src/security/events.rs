use serde::Serialize;
use tracing::warn;

use super::guard::GuardVerdict;
use super::rate_limit::Category;

/// Log target for security events, filterable with `RUST_LOG=security=warn`
pub const SECURITY_TARGET: &str = "security";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RateLimitExceeded,
    SuspiciousActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// Structured record of one denial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: Severity,
    pub category: Category,
    /// Client identity the decision was made for
    pub source: String,
    pub details: String,
}

impl SecurityEvent {
    /// Event for a denied verdict, `None` for a pass
    ///
    /// Quota denials on auth, payment and admin routes and every suspicious
    /// denial are high severity; other quota denials are medium.
    pub fn from_verdict(verdict: &GuardVerdict) -> Option<Self> {
        match verdict {
            GuardVerdict::Pass { .. } => None,
            GuardVerdict::RateLimited { identity, category, policy, decision } => Some(Self {
                event_type: EventType::RateLimitExceeded,
                severity: match category {
                    Category::Auth | Category::Payment | Category::Admin => Severity::High,
                    _ => Severity::Medium,
                },
                category: *category,
                source: identity.clone(),
                details: format!(
                    "{}: {} requests per {}s",
                    decision.reason().unwrap_or_default(),
                    policy.max_requests,
                    policy.window.as_secs()
                ),
            }),
            GuardVerdict::Suspicious { identity, category, reason } => Some(Self {
                event_type: EventType::SuspiciousActivity,
                severity: Severity::High,
                category: *category,
                source: identity.clone(),
                details: reason.as_str().to_string(),
            }),
        }
    }

    /// Write the event to the `security` log target
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(event) => warn!(target: SECURITY_TARGET, %event, "Request denied"),
            Err(e) => warn!(target: SECURITY_TARGET, error = %e, "Failed to serialize security event"),
        }
    }
}
