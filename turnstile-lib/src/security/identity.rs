//! Best-effort client identity from network headers.
//!
//! The identity is `<ip token>|<first N user-agent chars>`. The IP token comes
//! from the first present header among `cf-connecting-ip`, `x-real-ip` and the
//! first hop of `x-forwarded-for`. All of these can be forged by the client
//! unless a trusted reverse proxy overwrites them, which is what
//! [`TrustMode::Allowlist`] enforces: headers from any other peer are ignored
//! and the socket address is used instead.

use ipnet::IpNet;
use std::net::IpAddr;

use super::request::ClientRequest;
use super::trusted_proxy::is_trusted_proxy;
use crate::config::{IdentityConfig, TrustMode};

/// Placeholder for a missing IP token or user agent.
pub const UNKNOWN: &str = "unknown";

/// Separator between the IP token and the user-agent prefix.
pub const SEPARATOR: char = '|';

/// Header names consulted for the client IP, in priority order.
pub mod names {
    pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
    pub const X_REAL_IP: &str = "x-real-ip";
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
}

const DEFAULT_USER_AGENT_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct IdentityResolver {
    trust: TrustMode,
    trusted_proxies: Vec<IpNet>,
    user_agent_chars: usize,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self {
            trust: TrustMode::Any,
            trusted_proxies: vec![],
            user_agent_chars: DEFAULT_USER_AGENT_CHARS,
        }
    }
}

impl IdentityResolver {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            trust: config.trust,
            trusted_proxies: config.trusted_proxies.clone(),
            user_agent_chars: config.user_agent_chars,
        }
    }

    /// Whether forwarding and identity headers from this request's peer are honored.
    pub fn trusts(&self, req: &ClientRequest<'_>) -> bool {
        is_trusted_proxy(req.peer, self.trust, &self.trusted_proxies)
    }

    /// IP token for the request; never fails, degrades to [`UNKNOWN`].
    pub fn client_ip(&self, req: &ClientRequest<'_>) -> String {
        if self.trusts(req) {
            if let Some(ip) = forwarded_ip(req) {
                return ip.to_string();
            }
        }
        match (self.trust, req.peer) {
            (TrustMode::Allowlist, Some(peer)) => peer.to_string(),
            // in "any" mode the peer is typically the reverse proxy itself, so
            // bucketing every header-less caller under it would be wrong anyway
            _ => UNKNOWN.to_string(),
        }
    }

    /// Full identity: IP token, separator, truncated user agent.
    pub fn resolve(&self, req: &ClientRequest<'_>) -> String {
        let ip = self.client_ip(req);
        let user_agent = req.user_agent();
        let user_agent = user_agent.as_deref().unwrap_or(UNKNOWN);

        let mut identity = String::with_capacity(ip.len().saturating_add(1).saturating_add(
            user_agent.len().min(self.user_agent_chars.saturating_mul(4)),
        ));
        identity.push_str(&ip);
        identity.push(SEPARATOR);
        identity.extend(user_agent.chars().take(self.user_agent_chars));
        identity
    }
}

fn forwarded_ip<'a>(req: &ClientRequest<'a>) -> Option<&'a str> {
    req.header(names::CF_CONNECTING_IP)
        .or_else(|| req.header(names::X_REAL_IP))
        .or_else(|| {
            req.header(names::X_FORWARDED_FOR)
                .and_then(|xff| xff.split(',').next())
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
        })
}
