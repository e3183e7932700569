use http::header::HeaderValue;
use http::{HeaderMap, Request, Response};
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::Incoming;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

use crate::gateway::client_pool::UpstreamClient;
use crate::gateway::http_result::{HttpError, HttpResult};
use crate::security::identity::names;
use crate::telemetry::Metrics;

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

pub struct ForwardConfig<'a> {
    /// Upstream address (host:port)
    pub upstream: &'a str,
    pub client: &'a UpstreamClient,
    pub timeout: Duration,
    pub metrics: Option<&'a Metrics>,
}

/// Append the peer to `X-Forwarded-For` (or create it) and set `X-Forwarded-Proto`
pub fn add_forwarded_headers(headers: &mut HeaderMap, peer: IpAddr) {
    let client_ip = peer.to_string();
    let value = match headers.get(names::X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip,
    };
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        headers.insert(names::X_FORWARDED_FOR, header_value);
    }

    headers
        .entry(X_FORWARDED_PROTO)
        .or_insert(HeaderValue::from_static("http"));
}

pub(crate) fn upstream_uri(upstream: &str, req_uri: &http::Uri) -> HttpResult<http::Uri> {
    let pq = req_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("http://{upstream}{pq}")
        .parse::<http::Uri>()
        .map_err(|e| HttpError::InvalidUri(e.to_string()))
}

/// Send an admitted request to the upstream application
pub async fn forward(
    req: Request<Incoming>,
    peer: IpAddr,
    config: ForwardConfig<'_>,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let uri = upstream_uri(config.upstream, req.uri())?;

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    add_forwarded_headers(&mut parts.headers, peer);
    let out_req = Request::from_parts(parts, body);

    let result = tokio::time::timeout(config.timeout, config.client.client().request(out_req)).await;
    let duration = start.elapsed().as_secs_f64();

    match result {
        Ok(Ok(resp)) => {
            if let Some(m) = config.metrics {
                m.record_upstream_request(resp.status().as_u16(), duration);
            }
            Ok(resp.map(|b| b.boxed()))
        }
        Ok(Err(e)) => Err(HttpError::UpstreamUnavailable(e.to_string())),
        Err(_) => Err(HttpError::UpstreamTimeout(
            u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
