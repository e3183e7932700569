use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Route};
use crate::error::Result;
use crate::gateway::client_pool::UpstreamClient;
use crate::security::rate_limit::Category;
use crate::security::Guard;
use crate::telemetry::Metrics;

/// Everything a request handler needs, shared by all connections
pub struct GatewayState {
    pub guard: Arc<Guard>,
    pub routes: Vec<Route>,
    pub default_category: Category,
    pub upstream: String,
    pub client: UpstreamClient,
    pub upstream_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub metrics: Option<Arc<Metrics>>,
}

impl GatewayState {
    pub fn from_config(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        Ok(Self::with_guard(config, Arc::new(Guard::from_config(config)?), metrics))
    }

    /// State around an already built guard, e.g. one shared with the sweeper
    pub fn with_guard(config: &Config, guard: Arc<Guard>, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            guard,
            routes: config.routes.clone(),
            default_category: config.rate_limit.default_category,
            upstream: config.upstream.clone(),
            client: UpstreamClient::new(&config.timeout.keep_alive),
            upstream_timeout: Duration::from_millis(config.timeout.upstream_ms),
            shutdown_timeout: Duration::from_secs(config.timeout.shutdown_secs),
            metrics,
        }
    }
}
