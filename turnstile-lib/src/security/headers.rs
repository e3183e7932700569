use http::{HeaderMap, HeaderName, HeaderValue, Response};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::rate_limit::{Policy, RateLimitDecision};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Build the rate limit header set for a decision
///
/// Headers produced:
/// - `x-ratelimit-limit`: the policy's `max_requests`
/// - `x-ratelimit-remaining`: requests left in the window, `0` when limited
/// - `x-ratelimit-reset`: window close as Unix epoch seconds
/// - `retry-after`: whole seconds until the window closes, rounded up and
///   never below 1; only when the decision is limited
pub fn rate_limit_headers(decision: &RateLimitDecision, policy: &Policy, now: SystemTime) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(4);

    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(policy.max_requests));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining()));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(epoch_secs(decision.reset_at())));

    if let Some(wait) = decision.retry_after(now) {
        headers.insert(http::header::RETRY_AFTER, HeaderValue::from(retry_after_secs(wait)));
    }

    headers
}

/// Add the rate limit headers for `decision` to a response, replacing any
/// the upstream already set
pub fn apply_rate_limit_headers<T>(
    response: &mut Response<T>,
    decision: &RateLimitDecision,
    policy: &Policy,
    now: SystemTime,
) {
    for (name, value) in rate_limit_headers(decision, policy, now) {
        if let Some(name) = name {
            response.headers_mut().insert(name, value);
        }
    }
}

fn epoch_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    let secs = if wait.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs };
    secs.max(1)
}
