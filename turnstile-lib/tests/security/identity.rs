use http::header::{HeaderValue, USER_AGENT};
use http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr};

use turnstile_lib::config::{load_from_str, IdentityConfig};
use turnstile_lib::security::identity::{IdentityResolver, UNKNOWN};
use turnstile_lib::security::ClientRequest;

fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(*name, HeaderValue::from_static(value));
    }
    map
}

#[test]
fn identity_combines_ip_and_user_agent() {
    let resolver = IdentityResolver::new(&IdentityConfig::default());
    let map = headers(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1"), ("user-agent", "Mozilla/5.0")]);
    assert_eq!(resolver.resolve(&ClientRequest::new(&map)), "198.51.100.4|Mozilla/5.0");
}

#[test]
fn missing_everything_yields_shared_unknown_bucket() {
    let resolver = IdentityResolver::default();
    let a = HeaderMap::new();
    let b = headers(&[("x-forwarded-for", "")]);

    let first = resolver.resolve(&ClientRequest::new(&a));
    let second = resolver.resolve(&ClientRequest::new(&b));
    assert_eq!(first, format!("{UNKNOWN}|{UNKNOWN}"));
    assert_eq!(first, second);
}

#[test]
fn user_agent_prefix_is_counted_in_characters() {
    let resolver = IdentityResolver::default();
    let mut map = headers(&[("x-real-ip", "203.0.113.1")]);
    // 60 visible ASCII characters
    map.insert(
        USER_AGENT,
        HeaderValue::from_static("abcdefghijabcdefghijabcdefghijabcdefghijabcdefghijabcdefghij"),
    );

    let identity = resolver.resolve(&ClientRequest::new(&map));
    let ua = identity.split_once('|').map(|(_, ua)| ua).unwrap_or_default();
    assert_eq!(ua.chars().count(), 50);
}

#[test]
fn allowlist_from_config_uses_socket_peer_for_direct_clients() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:3000"

[identity]
trust = "allowlist"
trusted_proxies = ["127.0.0.1"]
"#,
    )?;
    let resolver = IdentityResolver::new(&cfg.identity);
    let spoofed = headers(&[("cf-connecting-ip", "1.1.1.1"), ("user-agent", "Mozilla/5.0")]);

    let direct = ClientRequest::new(&spoofed).with_peer(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)));
    assert_eq!(resolver.resolve(&direct), "198.51.100.7|Mozilla/5.0");

    let proxied = ClientRequest::new(&spoofed).with_peer(IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(resolver.resolve(&proxied), "1.1.1.1|Mozilla/5.0");
    Ok(())
}
