//! The ordered route table.
//!
//! # Ordering
//! Routes are kept sorted "enough" that routes sharing a literal prefix sit
//! next to each other, which is what lets the compiler fold them into one
//! trie branch. A new route is placed after the last route whose prefix
//! sorts at or before its own (or extends its own prefix), scanning from
//! the end. Within a group the earlier registration stays in front, so it
//! wins whenever two patterns match the same path.
//!
//! Tables are never mutated in place: `with_route` returns a new table and
//! readers keep whatever snapshot they loaded.

use std::fmt;
use std::sync::Arc;

use crate::http::BoxHandler;
use crate::routing::method::MethodSet;
use crate::routing::pattern::Pattern;

/// A registered route.
pub struct Route {
    prefix: String,
    methods: MethodSet,
    pattern: Pattern,
    handler: BoxHandler,
}

impl Route {
    pub fn new(pattern: Pattern, methods: MethodSet, handler: BoxHandler) -> Self {
        Self {
            prefix: pattern.prefix().to_string(),
            methods,
            pattern,
            handler,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods)
            .finish()
    }
}

/// An immutable, ordered snapshot of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this table with `route` inserted at its ordered position.
    pub fn with_route(&self, route: Route) -> RouteTable {
        let at = self.insertion_point(route.prefix());

        let mut routes = Vec::with_capacity(self.routes.len() + 1);
        routes.extend_from_slice(&self.routes[..at]);
        routes.push(Arc::new(route));
        routes.extend_from_slice(&self.routes[at..]);
        RouteTable { routes }
    }

    fn insertion_point(&self, prefix: &str) -> usize {
        let mut i = self.routes.len();
        while i > 0 {
            let existing = self.routes[i - 1].prefix();
            if existing <= prefix || existing.starts_with(prefix) {
                break;
            }
            i -= 1;
        }
        i
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Route>> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
