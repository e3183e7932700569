use http::header::{HeaderValue, USER_AGENT};
use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use turnstile_lib::config::{SuspicionAction, SuspicionConfig};
use turnstile_lib::security::{
    ClientRequest, Guard, GuardVerdict, SuspicionDetector, SuspicionReason, SuspicionVerdict,
};

const BROWSER: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

fn with_ua(ua: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.50"));
    headers.insert(USER_AGENT, HeaderValue::from_static(ua));
    headers
}

#[test]
fn curl_is_flagged_as_bot() {
    let detector = SuspicionDetector::default();
    let headers = with_ua("curl/7.68.0");
    let verdict = detector.check(&ClientRequest::new(&headers), "id", at(0));

    let reason = verdict.reason().map(|r| r.as_str()).unwrap_or_default();
    assert!(verdict.is_suspicious());
    assert!(reason.contains("bot"), "reason: {reason}");
}

#[test]
fn missing_user_agent_is_flagged() {
    let detector = SuspicionDetector::default();
    let headers = HeaderMap::new();
    let verdict = detector.check(&ClientRequest::new(&headers), "id", at(0));

    let reason = verdict.reason().map(|r| r.as_str()).unwrap_or_default();
    assert!(reason.contains("missing"), "reason: {reason}");
}

#[test]
fn normal_browser_at_low_volume_is_never_flagged() {
    let detector = SuspicionDetector::default();
    let headers = with_ua(BROWSER);
    let req = ClientRequest::new(&headers);

    for i in 0..50 {
        assert_eq!(detector.check(&req, "browser", at(i)), SuspicionVerdict::Clean, "request {i}");
    }
}

#[test]
fn burst_is_counted_across_categories() {
    let guard = Guard::default();
    let headers = with_ua(BROWSER);
    let req = ClientRequest::new(&headers);
    let categories = [
        turnstile_lib::Category::General,
        turnstile_lib::Category::ContentAccess,
        turnstile_lib::Category::Admin,
    ];

    // 50 requests spread over categories, each within its own quota
    for i in 0..50u64 {
        let category = categories[(i % 3) as usize];
        assert!(guard.inspect_at(&req, category, None, at(i / 2)).is_pass(), "request {i}");
    }

    let verdict = guard.inspect_at(&req, turnstile_lib::Category::ContentAccess, None, at(30));
    assert!(matches!(
        verdict,
        GuardVerdict::Suspicious { reason: SuspicionReason::RapidRequests, .. }
    ));
    assert_eq!(verdict.reason(), Some("rapid request pattern detected"));

    // the burst window is one minute from the first request
    assert!(guard.inspect_at(&req, turnstile_lib::Category::ContentAccess, None, at(60)).is_pass());
}

#[test]
fn log_action_lets_bots_through_to_quota() {
    let config = SuspicionConfig { action: SuspicionAction::Log, ..Default::default() };
    let guard = Guard::new(
        turnstile_lib::security::RateLimiter::new(Default::default()),
        Some(SuspicionDetector::new(&config)),
        Default::default(),
    )
    .with_suspicion_action(config.action);
    let headers = with_ua("python-requests/2.31 scraper");

    let verdict = guard.inspect_at(&ClientRequest::new(&headers), turnstile_lib::Category::Auth, None, at(0));
    assert!(matches!(
        verdict,
        GuardVerdict::Pass { flagged: Some(SuspicionReason::BotUserAgent), .. }
    ));
}
