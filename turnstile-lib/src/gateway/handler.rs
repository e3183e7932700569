use http::StatusCode;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::gateway::forwarding::{forward, ForwardConfig};
use crate::gateway::routing::pick_route;
use crate::gateway::state::GatewayState;
use crate::gateway::synthetic_response::{synthetic_error_response, too_many_requests};
use crate::security::{
    apply_rate_limit_headers, rate_limit_headers, ClientRequest, GuardVerdict, SecurityEvent,
};

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

/// Guard one request and, if it passes, forward it upstream
///
/// Never fails: denials become 429 responses and upstream failures become
/// 502 or 504, all carrying the rate limit headers when a quota was evaluated.
pub async fn handle_request(
    req: Request<Incoming>,
    state: &GatewayState,
    peer: SocketAddr,
) -> Response<RespBody> {
    let start = Instant::now();
    let now = SystemTime::now();
    let method = req.method().clone();
    let route = pick_route(req.uri().path(), &state.routes, state.default_category);

    let verdict = {
        let client = ClientRequest::new(req.headers()).with_peer(peer.ip());
        // a session identity is only believed from a peer allowed to set headers
        let identity_override = route
            .identity_header
            .filter(|_| state.guard.resolver().trusts(&client))
            .and_then(|name| client.header(name));
        state.guard.inspect_at(&client, route.category, identity_override, now)
    };

    let metrics = state.metrics.as_deref();
    let response = match verdict {
        GuardVerdict::Suspicious { reason, .. } => {
            if let Some(m) = metrics {
                m.record_suspicious(reason, true);
            }
            if let Some(event) = SecurityEvent::from_verdict(&verdict) {
                event.emit();
            }
            too_many_requests(reason.as_str(), http::HeaderMap::new())
        }
        GuardVerdict::RateLimited { category, policy, decision, .. } => {
            if let Some(m) = metrics {
                m.record_rate_limit_request(category);
                m.record_rate_limit_rejection(category);
            }
            if let Some(event) = SecurityEvent::from_verdict(&verdict) {
                event.emit();
            }
            too_many_requests(
                decision.reason().unwrap_or_default(),
                rate_limit_headers(&decision, &policy, now),
            )
        }
        GuardVerdict::Pass { ref identity, category, policy, decision, flagged } => {
            if let Some(reason) = flagged {
                if let Some(m) = metrics {
                    m.record_suspicious(reason, false);
                }
                info!(
                    target: crate::security::SECURITY_TARGET,
                    source = %identity,
                    category = %category,
                    reason = reason.label(),
                    "Suspicious request allowed (action = log)"
                );
            }
            if let (Some(m), Some(_)) = (metrics, decision) {
                m.record_rate_limit_request(category);
                m.record_rate_limit_allowed(category);
            }

            let forward_config = ForwardConfig {
                upstream: &state.upstream,
                client: &state.client,
                timeout: state.upstream_timeout,
                metrics,
            };
            let mut resp = match forward(req, peer.ip(), forward_config).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(?peer, error = %e, "Upstream request failed");
                    if let Some(m) = metrics {
                        m.record_error(e.error_type());
                    }
                    synthetic_error_response(StatusCode::from(&e))
                }
            };
            if let Some(decision) = decision {
                apply_rate_limit_headers(&mut resp, &decision, &policy, now);
            }
            resp
        }
    };

    let status = response.status().as_u16();
    debug!(?peer, %method, status, category = %route.category, "Request handled");
    if let Some(m) = metrics {
        m.record_request(method.as_str(), status, route.category);
        m.record_request_duration(start.elapsed().as_secs_f64(), route.category);
    }
    response
}
