use ipnet::IpNet;
use std::net::IpAddr;

use crate::config::TrustMode;

/// Check whether forwarding headers sent by `peer` may be believed
///
/// # Logic:
/// - If mode is `TrustMode::Any`: always trusted, even with no known peer
/// - If mode is `TrustMode::Allowlist`: trusted only if the peer IP lies in one
///   of the `trusted_proxies` networks; an unknown peer is never trusted
pub fn is_trusted_proxy(peer: Option<IpAddr>, mode: TrustMode, trusted_proxies: &[IpNet]) -> bool {
    match mode {
        TrustMode::Any => true,
        TrustMode::Allowlist => match peer {
            Some(ip) => trusted_proxies.iter().any(|net| net.contains(&canonical(ip))),
            None => false,
        },
    }
}

// IPv4 peers accepted on a dual-stack socket show up as ::ffff:a.b.c.d
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}
