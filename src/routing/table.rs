//! Route table and prefix matching.
//!
//! # Responsibilities
//! - Hold the (prefix, backend) bindings compiled at startup
//! - Resolve request paths by longest-prefix match
//! - Respect segment boundaries ("/orders" never matches "/ordersmisc")
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by descending prefix length, so the first literal match
//!   is the longest one
//! - No regex; a linear scan over a small static table

use std::sync::Arc;

use crate::config::schema::RouteConfig;
use crate::upstream::backend::{BackendTarget, InvalidTarget};

/// A single prefix-to-backend binding.
#[derive(Debug, Clone)]
pub struct Route {
    prefix: String,
    backend: Arc<BackendTarget>,
}

impl Route {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &BackendTarget {
        &self.backend
    }
}

/// Ordered set of routes, queried by longest-prefix match.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the table from configuration. Backend URLs are parsed once
    /// here; configs that passed validation cannot fail.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, InvalidTarget> {
        let mut compiled = Vec::with_capacity(routes.len());
        for route in routes {
            compiled.push(Route {
                prefix: route.prefix.clone(),
                backend: Arc::new(BackendTarget::parse(&route.backend)?),
            });
        }
        compiled.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Self { routes: compiled })
    }

    /// Find the route with the longest prefix matching `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| prefix_matches(&route.prefix, path))
    }

    /// Backends referenced by the table, for building connection pools.
    pub fn backends(&self) -> impl Iterator<Item = Arc<BackendTarget>> + '_ {
        self.routes.iter().map(|route| Arc::clone(&route.backend))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// A prefix matches when it is a leading substring of the path ending on a
/// segment boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if !path.starts_with(prefix) {
        return false;
    }
    prefix.ends_with('/') || matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
}
