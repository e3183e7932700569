use http::HeaderName;

use crate::config::security::TrustMode;
use crate::config::Config;

pub fn validate(config: &Config) -> Result<(), String> {
    if config.upstream.trim().is_empty() {
        return Err("upstream address cannot be empty".into());
    }
    if config.upstream.contains('/') {
        return Err(format!(
            "upstream must be host:port without scheme or path, got \"{}\"",
            config.upstream
        ));
    }

    for route in &config.routes {
        if !route.prefix.starts_with('/') {
            return Err(format!("route prefix must start with '/', got \"{}\"", route.prefix));
        }
        if let Some(name) = &route.identity_header {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(format!(
                    "route \"{}\" has an invalid identity_header \"{name}\"",
                    route.prefix
                ));
            }
        }
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.shards == 0 {
        return Err("rate_limit.shards must be > 0".into());
    }
    if rate_limit.sweep_interval_secs == 0 {
        return Err("rate_limit.sweep_interval_secs must be > 0".into());
    }
    for (category, policy) in &rate_limit.policies {
        if policy.max_requests == Some(0) {
            return Err(format!("rate_limit.policies.{category}.max_requests must be > 0"));
        }
        if policy.window_secs == Some(0) {
            return Err(format!("rate_limit.policies.{category}.window_secs must be > 0"));
        }
    }

    let suspicion = &config.suspicion;
    if suspicion.burst_threshold == 0 {
        return Err("suspicion.burst_threshold must be > 0".into());
    }
    if suspicion.burst_window_secs == 0 {
        return Err("suspicion.burst_window_secs must be > 0".into());
    }
    if suspicion.bot_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err("suspicion.bot_patterns cannot contain empty patterns".into());
    }

    if config.identity.trust == TrustMode::Allowlist && config.identity.trusted_proxies.is_empty() {
        return Err("identity.trusted_proxies is required when trust = \"allowlist\"".into());
    }

    if config.timeout.upstream_ms == 0 {
        return Err("timeout.upstream_ms must be > 0".into());
    }
    Ok(())
}
