use serde::Deserialize;
use std::net::SocketAddr;

use super::routes::Route;
use super::security::{IdentityConfig, RateLimitConfig, SuspicionConfig};
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:7000" or "127.0.0.1:8080"
    pub listen: SocketAddr,
    /// Address of the guarded course application (host:port format)
    /// Example: "app:3000" or "127.0.0.1:3000"
    pub upstream: String,
    /// Path prefix to category rules (optional)
    /// Requests matching no route use `rate_limit.default_category`
    #[serde(default)]
    pub routes: Vec<Route>,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Suspicious activity detection configuration
    #[serde(default)]
    pub suspicion: SuspicionConfig,
    /// Client identity resolution configuration
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Build a configuration with every optional section at its default.
    pub fn new(listen: SocketAddr, upstream: impl Into<String>) -> Self {
        Self {
            listen,
            upstream: upstream.into(),
            routes: vec![],
            rate_limit: RateLimitConfig::default(),
            suspicion: SuspicionConfig::default(),
            identity: IdentityConfig::default(),
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}
