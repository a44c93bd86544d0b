//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled route groups
//! - Resolve a request path to a service name and upstream path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan (acceptable for typical route counts)
//! - Longest prefix wins

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route group.
#[derive(Debug, Clone)]
pub struct Route {
    pub matcher: PathPrefixMatcher,
    pub service: String,
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub service: &'a str,
    pub upstream_path: String,
}

/// Route table mapping path prefixes to services.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes, ordering them longest prefix first.
    pub fn from_config(configs: Vec<RouteConfig>) -> Self {
        let mut routes: Vec<Route> = configs
            .into_iter()
            .map(|c| Route {
                matcher: PathPrefixMatcher::new(c.prefix),
                service: c.service,
            })
            .collect();
        routes.sort_by(|a, b| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()));

        for route in &routes {
            tracing::debug!(prefix = %route.matcher.prefix(), service = %route.service, "Route compiled");
        }
        Self { routes }
    }

    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            route.matcher.strip(path).map(|upstream_path| RouteMatch {
                service: route.service.as_str(),
                upstream_path,
            })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
