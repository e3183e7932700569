use crate::config::Route;
use crate::security::rate_limit::Category;

/// Category and identity source chosen for a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub category: Category,
    /// `None` when no route matched and the default category applies
    pub matched_prefix: Option<&'a str>,
    pub identity_header: Option<&'a str>,
}

/// First route whose prefix the path starts with; `default_category` otherwise
pub fn pick_route<'a>(path: &str, routes: &'a [Route], default_category: Category) -> RouteMatch<'a> {
    routes
        .iter()
        .find(|r| path.starts_with(&r.prefix))
        .map(|r| RouteMatch {
            category: r.category,
            matched_prefix: Some(r.prefix.as_str()),
            identity_header: r.identity_header.as_deref(),
        })
        .unwrap_or(RouteMatch { category: default_category, matched_prefix: None, identity_header: None })
}
