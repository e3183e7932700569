use ipnet::IpNet;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::security::rate_limit::Category;

/// Rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable per-category rate limiting
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Category applied to requests that match no route
    /// Default: "general"
    #[serde(default = "default_category")]
    pub default_category: Category,
    /// Soft cap on the number of window records
    /// Inserting past it sweeps expired records inline; `0` disables that
    /// Default: 100000
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
    /// Number of independently locked shards in the window store,
    /// rounded up to a power of two
    /// Default: 64
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Interval of the background expiry sweep in seconds
    /// Default: 60
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Per-category overrides of the built-in policy table
    ///
    /// ```toml
    /// [rate_limit.policies.auth]
    /// max_requests = 10
    /// window_secs = 600
    /// ```
    #[serde(default)]
    pub policies: BTreeMap<Category, PolicyConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_category: default_category(),
            max_keys: default_max_keys(),
            shards: default_shards(),
            sweep_interval_secs: default_sweep_interval(),
            policies: BTreeMap::new(),
        }
    }
}

/// Override of a single category policy
/// Unset fields keep the built-in default for that category
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyConfig {
    /// Requests permitted per window
    pub max_requests: Option<u32>,
    /// Window length in seconds
    pub window_secs: Option<u64>,
}

/// What the guard does with a suspicious verdict
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuspicionAction {
    /// Reject immediately with 429
    #[default]
    Deny,
    /// Record the verdict and let the request continue to the rate limiter
    Log,
}

/// Suspicious activity detection configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SuspicionConfig {
    /// Enable the detector
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Action taken on a suspicious verdict
    /// Default: "deny"
    #[serde(default)]
    pub action: SuspicionAction,
    /// User agents shorter than this (in characters) are flagged
    /// Default: 10
    #[serde(default = "default_min_user_agent_len")]
    pub min_user_agent_len: usize,
    /// Case-insensitive substrings marking automation tools
    /// Default: bot, crawler, spider, scraper, curl, wget, postman
    #[serde(default = "default_bot_patterns")]
    pub bot_patterns: Vec<String>,
    /// Requests per burst window above which an identity is flagged
    /// Default: 50
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: u32,
    /// Burst window length in seconds
    /// Default: 60
    #[serde(default = "default_burst_window")]
    pub burst_window_secs: u64,
}

impl Default for SuspicionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action: SuspicionAction::default(),
            min_user_agent_len: default_min_user_agent_len(),
            bot_patterns: default_bot_patterns(),
            burst_threshold: default_burst_threshold(),
            burst_window_secs: default_burst_window(),
        }
    }
}

/// Which peers may set forwarding headers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// Honor forwarding headers from any peer
    ///
    /// Only safe when a reverse proxy in front of turnstile overwrites
    /// `cf-connecting-ip`, `x-real-ip` and `x-forwarded-for` on every request.
    #[default]
    Any,
    /// Honor forwarding headers only from peers in `trusted_proxies`
    Allowlist,
}

/// Client identity resolution configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IdentityConfig {
    /// Trust mode for forwarding headers
    /// Default: "any"
    #[serde(default)]
    pub trust: TrustMode,
    /// Networks whose forwarding headers are honored (when trust = "allowlist")
    /// Supports CIDR notation: ["10.0.0.0/8", "::1/128"]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_ip_networks")]
    pub trusted_proxies: Vec<IpNet>,
    /// Number of user-agent characters mixed into the identity
    /// Default: 50
    #[serde(default = "default_user_agent_chars")]
    pub user_agent_chars: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            trust: TrustMode::default(),
            trusted_proxies: vec![],
            user_agent_chars: default_user_agent_chars(),
        }
    }
}

/// Custom deserializer for IP networks that handles parsing errors gracefully
fn deserialize_ip_networks<'de, D>(deserializer: D) -> Result<Vec<IpNet>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let strings: Vec<String> = Vec::deserialize(deserializer)?;
    let mut networks = Vec::new();

    for s in strings {
        match s.parse::<IpNet>() {
            Ok(net) => networks.push(net),
            Err(_) => match s.parse::<std::net::IpAddr>() {
                // a bare address is a single-host network
                Ok(ip) => networks.push(IpNet::from(ip)),
                Err(e) => {
                    return Err(serde::de::Error::custom(format!(
                        "Invalid IP network '{}': {}",
                        s, e
                    )));
                }
            },
        }
    }

    Ok(networks)
}

fn default_true() -> bool {
    true
}

fn default_category() -> Category {
    Category::General
}

fn default_max_keys() -> usize {
    100_000
}

fn default_shards() -> usize {
    64
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_min_user_agent_len() -> usize {
    10
}

pub(crate) fn default_bot_patterns() -> Vec<String> {
    ["bot", "crawler", "spider", "scraper", "curl", "wget", "postman"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_burst_threshold() -> u32 {
    50
}

fn default_burst_window() -> u64 {
    60
}

fn default_user_agent_chars() -> usize {
    50
}
