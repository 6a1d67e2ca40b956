//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Resolve a request path to a service and a rewritten path
//! - Return the resolution or an explicit `RouteNotFound`
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted longest prefix first, so the first match is the most specific
//! - Duplicate prefixes fail construction rather than shadowing each other

use std::sync::Arc;

use crate::config::{ProxyConfig, ValidationError};
use crate::error::GatewayError;
use crate::routing::matcher::PathPrefixMatcher;

/// One prefix → service mapping.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    service: Arc<str>,
}

impl Route {
    pub fn new(prefix: impl AsRef<str>, service: impl Into<Arc<str>>) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            service: service.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Service the request belongs to.
    pub service: Arc<str>,
    /// Path with the prefix stripped, followed by the untouched query string.
    pub path_and_query: String,
}

/// Longest-prefix route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table, failing on identical prefixes.
    pub fn new(routes: Vec<Route>) -> Result<Self, ValidationError> {
        let mut routes = routes;
        routes.sort_by(|a, b| {
            b.prefix()
                .len()
                .cmp(&a.prefix().len())
                .then_with(|| a.prefix().cmp(b.prefix()))
        });

        for pair in routes.windows(2) {
            if pair[0].prefix() == pair[1].prefix() {
                return Err(ValidationError::DuplicatePrefix {
                    prefix: pair[0].prefix().to_string(),
                    first: pair[0].service().to_string(),
                    second: pair[1].service().to_string(),
                });
            }
        }

        Ok(Self { routes })
    }

    /// Build the table from the `services` section of the configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        let routes = config
            .services
            .iter()
            .map(|(name, service)| Route::new(&service.path_prefix, name.as_str()))
            .collect();
        Self::new(routes)
    }

    /// Resolve `path` (and optional raw `query`) to a service.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<ResolvedRoute, GatewayError> {
        for route in &self.routes {
            if let Some(rest) = route.matcher.strip(path) {
                let path_and_query = match query {
                    Some(q) => format!("{}?{}", rest, q),
                    None => rest.into_owned(),
                };
                return Ok(ResolvedRoute {
                    service: route.service.clone(),
                    path_and_query,
                });
            }
        }
        Err(GatewayError::RouteNotFound(path.to_string()))
    }

    /// Routes in match order (longest prefix first).
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(routes: &[(&str, &str)]) -> RouteTable {
        RouteTable::new(
            routes
                .iter()
                .map(|(prefix, service)| Route::new(prefix, *service))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn longest_prefix_wins() {
        let table = table(&[("/users", "users-svc"), ("/users/admin", "users-admin-svc")]);

        let resolved = table.resolve("/users/admin/42", None).unwrap();
        assert_eq!(&*resolved.service, "users-admin-svc");
        assert_eq!(resolved.path_and_query, "/42");

        let resolved = table.resolve("/users/7", None).unwrap();
        assert_eq!(&*resolved.service, "users-svc");
        assert_eq!(resolved.path_and_query, "/7");
    }

    #[test]
    fn registration_order_does_not_matter() {
        let forward = table(&[("/a", "short"), ("/a/b", "long")]);
        let reverse = table(&[("/a/b", "long"), ("/a", "short")]);
        for t in [forward, reverse] {
            assert_eq!(&*t.resolve("/a/b/c", None).unwrap().service, "long");
        }
    }

    #[test]
    fn query_string_is_preserved() {
        let table = table(&[("/orders", "orders")]);
        let resolved = table.resolve("/orders/list", Some("page=2&sort=desc")).unwrap();
        assert_eq!(resolved.path_and_query, "/list?page=2&sort=desc");

        let resolved = table.resolve("/orders", Some("a=1")).unwrap();
        assert_eq!(resolved.path_and_query, "/?a=1");
    }

    #[test]
    fn unmatched_path_is_not_found() {
        let table = table(&[("/users", "users")]);
        assert!(matches!(
            table.resolve("/products/1", None),
            Err(GatewayError::RouteNotFound(p)) if p == "/products/1"
        ));
        assert!(table.resolve("/usersx", None).is_err());
    }

    #[test]
    fn root_route_is_catch_all() {
        let table = table(&[("/", "default"), ("/api", "api")]);
        assert_eq!(&*table.resolve("/other", None).unwrap().service, "default");
        assert_eq!(&*table.resolve("/api/x", None).unwrap().service, "api");
    }

    #[test]
    fn duplicate_prefix_fails_fast() {
        let err = RouteTable::new(vec![Route::new("/api", "a"), Route::new("/api/", "b")]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicatePrefix { prefix, .. } if prefix == "/api"));
    }
}
