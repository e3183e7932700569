use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::config::KeepAliveConfig;

pub type HttpClient = Client<HttpConnector, Incoming>;

/// Shared HTTP/1.1 client for the upstream application
///
/// Connections are pooled and reused across requests; cloning is cheap and
/// shares the pool.
#[derive(Clone)]
pub struct UpstreamClient {
    client: HttpClient,
}

impl UpstreamClient {
    pub fn new(keep_alive: &KeepAliveConfig) -> Self {
        let mut connector = HttpConnector::new();
        // TCP keep-alive: sends periodic packets to keep TCP connection alive
        if keep_alive.enabled {
            connector.set_keepalive(Some(Duration::from_secs(keep_alive.timeout_secs)));
        } else {
            connector.set_keepalive(None);
        }
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_idle_timeout(Duration::from_secs(keep_alive.timeout_secs));

        Self { client: builder.build(connector) }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}
