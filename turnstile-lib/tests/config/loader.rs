use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use turnstile_lib::config::{load_from_path, load_from_str, SuspicionAction, TrustMode};
use turnstile_lib::security::{Category, PolicyTable};

#[test]
fn loads_minimal_config() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"
"#
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.to_string(), "127.0.0.1:0");
    assert_eq!(cfg.upstream, "localhost:3000");
    assert!(cfg.routes.is_empty());
    assert!(cfg.rate_limit.enabled);
    assert_eq!(cfg.rate_limit.default_category, Category::General);
    assert!(cfg.suspicion.enabled);
    assert_eq!(cfg.suspicion.action, SuspicionAction::Deny);
    assert_eq!(cfg.suspicion.burst_threshold, 50);
    assert_eq!(cfg.identity.trust, TrustMode::Any);
    assert_eq!(cfg.identity.user_agent_chars, 50);
    assert_eq!(cfg.telemetry.metrics_port, None);
    Ok(())
}

#[test]
fn loads_routes_policies_and_identity() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str(
        r#"
listen = "0.0.0.0:7000"
upstream = "app:3000"

[[routes]]
prefix = "/api/auth"
category = "auth"

[[routes]]
prefix = "/api/comments"
category = "comment-creation"
identity_header = "x-authenticated-user"

[rate_limit]
default_category = "content-access"
max_keys = 5000
shards = 16

[rate_limit.policies.auth]
max_requests = 10

[rate_limit.policies.upload]
max_requests = 2
window_secs = 30

[suspicion]
action = "log"
bot_patterns = ["HeadlessChrome", "python-requests"]

[identity]
trust = "allowlist"
trusted_proxies = ["10.0.0.0/8", "127.0.0.1"]

[telemetry]
metrics_port = 9900
"#,
    )?;

    assert_eq!(cfg.routes.len(), 2);
    assert_eq!(cfg.routes[1].category, Category::CommentCreation);
    assert_eq!(cfg.routes[1].identity_header.as_deref(), Some("x-authenticated-user"));
    assert_eq!(cfg.rate_limit.default_category, Category::ContentAccess);
    assert_eq!(cfg.suspicion.action, SuspicionAction::Log);
    assert_eq!(cfg.identity.trusted_proxies.len(), 2);
    assert_eq!(cfg.telemetry.metrics_port, Some(9900));

    let table = PolicyTable::from_config(&cfg.rate_limit)?;
    // partial override keeps the built-in window
    assert_eq!(table.get(Category::Auth).max_requests, 10);
    assert_eq!(table.get(Category::Auth).window, Duration::from_secs(15 * 60));
    assert_eq!(table.get(Category::Upload).window, Duration::from_secs(30));
    // untouched categories keep their defaults
    assert_eq!(table.get(Category::Payment).max_requests, 3);
    Ok(())
}

#[test]
fn rejects_unknown_category() {
    let result = load_from_str(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"

[[routes]]
prefix = "/api/refunds"
category = "refunds"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        // zero window
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"
[rate_limit.policies.general]
window_secs = 0
"#,
        // allowlist without proxies
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"
[identity]
trust = "allowlist"
"#,
        // malformed proxy network
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"
[identity]
trusted_proxies = ["10.0.0.0/33"]
"#,
        // upstream with scheme
        r#"
listen = "127.0.0.1:0"
upstream = "http://localhost:3000"
"#,
    ];

    for toml in cases {
        assert!(load_from_str(toml).is_err(), "expected rejection for:\n{toml}");
    }
}

#[test]
fn missing_file_is_config_error() {
    let result = load_from_path("/nonexistent/turnstile.toml");
    assert!(matches!(result, Err(turnstile_lib::TurnstileError::Config(_))));
}

#[test]
fn bundled_sample_config_is_valid() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/turnstile.toml");
    let cfg = load_from_path(path)?;

    assert_eq!(cfg.routes.len(), 6);
    assert_eq!(cfg.identity.trust, TrustMode::Allowlist);
    assert_eq!(cfg.telemetry.metrics_port, Some(9090));

    let auth = cfg.rate_limit.policies.get(&Category::Auth).copied().unwrap_or_default();
    assert_eq!(auth.max_requests, Some(5));
    assert_eq!(auth.window_secs, Some(900));
    Ok(())
}
