use http::header::{HeaderValue, RETRY_AFTER, USER_AGENT};
use http::HeaderMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use turnstile_lib::security::rate_limit::{
    Category, Policy, PolicyTable, RateLimitDecision, RateLimiter, WindowStore, RATE_LIMIT_EXCEEDED,
};
use turnstile_lib::security::{rate_limit_headers, ClientRequest, Guard};

const IDENTITY: &str = "1.2.3.4|Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/2010";

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

#[test]
fn auth_scenario_counts_down_then_denies() {
    let limiter = RateLimiter::new(PolicyTable::default());
    let policy = limiter.policy(Category::Auth);

    let remaining: Vec<u32> = (0..5)
        .map(|i| {
            let decision = limiter.evaluate(IDENTITY, Category::Auth, at(i));
            assert!(decision.is_allowed(), "request {} should pass", i + 1);
            decision.remaining()
        })
        .collect();
    assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

    let now = at(10);
    let sixth = limiter.evaluate(IDENTITY, Category::Auth, now);
    assert!(sixth.is_limited());
    assert_eq!(sixth.reason(), Some(RATE_LIMIT_EXCEEDED));
    assert_eq!(sixth.reset_at(), at(15 * 60));

    let headers = rate_limit_headers(&sixth, &policy, now);
    let retry_after: u64 = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    assert!(retry_after > 0);
    assert_eq!(retry_after, 15 * 60 - 10);
}

#[test]
fn payment_quota_is_isolated_from_other_categories() {
    let limiter = RateLimiter::new(PolicyTable::default());

    for _ in 0..3 {
        assert!(limiter.evaluate(IDENTITY, Category::Payment, at(0)).is_allowed());
    }
    assert!(limiter.evaluate(IDENTITY, Category::Payment, at(30 * 60)).is_limited());

    assert_eq!(limiter.evaluate(IDENTITY, Category::Auth, at(30 * 60)).remaining(), 4);
    assert_eq!(limiter.evaluate(IDENTITY, Category::General, at(30 * 60)).remaining(), 99);
}

#[test]
fn window_resets_after_expiry() {
    let limiter = RateLimiter::new(PolicyTable::default());
    for _ in 0..3 {
        limiter.evaluate(IDENTITY, Category::Payment, at(0));
    }
    assert!(limiter.evaluate(IDENTITY, Category::Payment, at(3599)).is_limited());

    // exactly at reset_at the next window opens
    let decision = limiter.evaluate(IDENTITY, Category::Payment, at(3600));
    assert_eq!(decision, RateLimitDecision::Allowed { remaining: 2, reset_at: at(7200) });
}

#[test]
fn identities_do_not_share_quota() {
    let limiter = RateLimiter::new(PolicyTable::default());
    for _ in 0..5 {
        limiter.evaluate("1.1.1.1|Mozilla/5.0", Category::Auth, at(0));
    }
    assert!(limiter.evaluate("1.1.1.1|Mozilla/5.0", Category::Auth, at(1)).is_limited());
    assert!(limiter.evaluate("2.2.2.2|Mozilla/5.0", Category::Auth, at(1)).is_allowed());
}

#[test]
fn concurrent_requests_never_oversubscribe_last_slot() {
    const THREADS: usize = 16;

    for _ in 0..20 {
        let policies = PolicyTable::default()
            .with(Category::Upload, Policy::new(3, Duration::from_secs(3600)))
            .unwrap_or_default();
        let limiter = Arc::new(RateLimiter::new(policies));

        // leave exactly one slot
        limiter.evaluate(IDENTITY, Category::Upload, at(0));
        limiter.evaluate(IDENTITY, Category::Upload, at(0));

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    limiter.evaluate(IDENTITY, Category::Upload, at(1)).is_allowed()
                })
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 1);
    }
}

#[test]
fn concurrent_allowed_count_matches_budget() {
    let limiter = Arc::new(RateLimiter::with_store(PolicyTable::default(), WindowStore::new(4, 0)));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..50)
                    .filter(|_| limiter.evaluate(IDENTITY, Category::General, at(0)).is_allowed())
                    .count()
            })
        })
        .collect();

    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap_or(0)).sum();
    assert_eq!(allowed, 100);
}

#[test]
fn concurrent_churn_of_live_keys_sweeps_logarithmically() {
    let store: Arc<WindowStore<String>> = Arc::new(WindowStore::new(8, 64));
    let barrier = Arc::new(Barrier::new(4));
    let window = Duration::from_secs(60);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..1000 {
                    store.admit(format!("{t}-{i}"), 10, window, at(0));
                    // known keys in between must not trigger a rescan
                    store.admit(format!("{t}-0"), 10, window, at(0));
                }
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().is_ok());
    }

    assert_eq!(store.len(), 4000);
    // the threshold doubles from 64 with the live count: a handful of sweeps, not one per request
    assert!(store.inline_sweeps() >= 1);
    assert!(store.inline_sweeps() <= 16, "sweeps: {}", store.inline_sweeps());
}

#[test]
fn sweep_bounds_store_to_live_windows() {
    let limiter = RateLimiter::new(PolicyTable::default());

    // 1000 identities seen once, all in 15 minute general windows
    for i in 0..1000 {
        limiter.evaluate(&format!("10.0.{}.{}|Mozilla/5.0", i / 256, i % 256), Category::General, at(0));
    }
    // 10 identities still active later
    for i in 0..10 {
        limiter.evaluate(&format!("192.168.0.{i}|Mozilla/5.0"), Category::General, at(600));
    }
    assert_eq!(limiter.tracked_keys(), 1010);

    let removed = limiter.sweep_expired(at(15 * 60));
    assert_eq!(removed, 1000);
    assert_eq!(limiter.tracked_keys(), 10);
}

#[test]
fn guard_applies_quota_after_suspicion_check() {
    let guard = Guard::default();
    let mut headers = HeaderMap::new();
    headers.insert("cf-connecting-ip", HeaderValue::from_static("1.2.3.4"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"),
    );
    let req = ClientRequest::new(&headers);

    for _ in 0..3 {
        assert!(guard.inspect_at(&req, Category::Payment, None, at(0)).is_pass());
    }
    let denied = guard.inspect_at(&req, Category::Payment, None, at(1));
    assert_eq!(denied.reason(), Some(RATE_LIMIT_EXCEEDED));
    assert_eq!(denied.category(), Category::Payment);
}
