use serde::Deserialize;

use crate::security::rate_limit::Category;

/// Route configuration for path-based categorisation
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Route {
    /// URL path prefix to match (e.g., "/api/auth", "/api/checkout")
    /// Routes are matched in order, first match wins
    pub prefix: String,
    /// Traffic category whose quota applies to matching requests
    pub category: Category,
    /// Header carrying an identity resolved by the session layer (optional)
    /// When present on a request from a trusted peer, its value replaces the
    /// header-derived client identity for this route
    /// Example: "x-authenticated-user"
    #[serde(default)]
    pub identity_header: Option<String>,
}
