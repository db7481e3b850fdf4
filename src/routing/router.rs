//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Own the route table and publish new snapshots on registration
//! - Lazily compile the automaton on the first request after a change
//! - Call the matched handler, or the not-found handler with the allowed
//!   methods attached
//!
//! # Design Decisions
//! - Readers load snapshots through `ArcSwap` and never take the lock
//! - The lock serializes registration and recompilation only
//! - A request that already loaded an automaton keeps using it

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::{ArcSwap, ArcSwapOption};
use axum::http::{header, HeaderValue, Method, StatusCode};
use percent_encoding::percent_decode_str;

use crate::http::context::AllowedMethods;
use crate::http::{BoxHandler, Context, Handler, Request, ResponseWriter};
use crate::routing::automaton::{Automaton, Resolution};
use crate::routing::compiler::compile;
use crate::routing::method::MethodSet;
use crate::routing::pattern::Pattern;
use crate::routing::table::{Route, RouteTable};

struct Fallback(BoxHandler);

/// The innermost layer of a mux: pattern dispatch.
pub struct Router {
    lock: Mutex<()>,
    routes: ArcSwap<RouteTable>,
    machine: ArcSwapOption<Automaton>,
    not_found: ArcSwap<Fallback>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            routes: ArcSwap::from_pointee(RouteTable::new()),
            machine: ArcSwapOption::empty(),
            not_found: ArcSwap::from_pointee(Fallback(Arc::new(default_not_found))),
        }
    }

    /// Register a route. The current automaton is discarded and rebuilt on
    /// the next request.
    pub fn handle(&self, pattern: Pattern, methods: MethodSet, handler: BoxHandler) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(pattern = %pattern.as_str(), methods = %methods, "Registering route");
        let routes = self.routes.load().with_route(Route::new(pattern, methods, handler));
        self.routes.store(Arc::new(routes));
        self.machine.store(None);
    }

    /// Replace the handler used when no route takes a request.
    pub fn set_not_found(&self, handler: BoxHandler) {
        self.not_found.store(Arc::new(Fallback(handler)));
    }

    /// Snapshot of the registered routes.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.load_full()
    }

    /// The current automaton, compiling it first if the table changed.
    pub fn machine(&self) -> Arc<Automaton> {
        if let Some(machine) = self.machine.load_full() {
            return machine;
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another request may have compiled while we waited.
        if let Some(machine) = self.machine.load_full() {
            return machine;
        }
        let machine = Arc::new(compile(&self.routes.load()));
        self.machine.store(Some(machine.clone()));
        machine
    }

    /// Dispatch one request. Routes match the percent-decoded path.
    pub fn route(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        let machine = self.machine();
        let method = MethodSet::of(req.method());
        let path = percent_decode_str(req.uri().path()).decode_utf8_lossy();

        match machine.route(method, &path) {
            Resolution::Matched { route, params } => {
                if params.is_empty() {
                    route.handler().serve(cx, w, req);
                } else {
                    route.handler().serve(&cx.with_value(params), w, req);
                }
            }
            Resolution::Unmatched { allowed } => {
                let not_found = self.not_found.load();
                if allowed.is_empty() {
                    not_found.0.serve(cx, w, req);
                } else {
                    not_found.0.serve(&cx.with_value(AllowedMethods(allowed)), w, req);
                }
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.load().len())
            .field("compiled", &self.machine.load().is_some())
            .finish()
    }
}

impl Handler for Router {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        self.route(cx, w, req)
    }
}

/// Default fallback: `OPTIONS` gets the allowed set, a method mismatch gets
/// 405, anything else 404. Both of the former carry an `Allow` header.
pub fn default_not_found(cx: &Context, w: &mut ResponseWriter, req: &Request) {
    let Some(allowed) = cx.allowed_methods() else {
        w.error(StatusCode::NOT_FOUND, "404 page not found");
        return;
    };

    if let Ok(value) = HeaderValue::from_str(&allowed.to_allow_header()) {
        w.headers_mut().insert(header::ALLOW, value);
    }
    if req.method() == Method::OPTIONS {
        w.write_header(StatusCode::OK);
    } else {
        w.error(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed");
    }
}
