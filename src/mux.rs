//! The public request multiplexer.
//!
//! A `Mux` pairs a [`Router`] with a [`MiddlewareStack`] whose innermost
//! layer is that router. Every request takes a chain from the stack's pool,
//! runs it and hands it back.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::http::service;
use crate::http::{BoxHandler, Context, Handler, Request, ResponseWriter};
use crate::middleware::{Middleware, MiddlewareStack};
use crate::routing::{MethodSet, Pattern, Router};

struct MuxInner {
    router: Arc<Router>,
    stack: MiddlewareStack,
}

/// Router plus middleware. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Mux {
    inner: Arc<MuxInner>,
}

macro_rules! method_aliases {
    ($($(#[$doc:meta])* $name:ident => $set:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name<H>(&self, pattern: &str, handler: H) -> Result<(), Error>
            where
                H: Handler + 'static,
            {
                self.handle_methods(pattern, MethodSet::$set, handler)
            }
        )*
    };
}

impl Mux {
    pub fn new() -> Self {
        let router = Arc::new(Router::new());
        let stack = MiddlewareStack::new(router.clone());
        Self {
            inner: Arc::new(MuxInner { router, stack }),
        }
    }

    /// Append a layer inside all existing ones.
    pub fn use_layer(&self, layer: Middleware) {
        self.inner.stack.use_layer(layer);
    }

    /// Insert `layer` immediately outside `before`.
    pub fn insert(&self, layer: Middleware, before: &Middleware) -> Result<(), Error> {
        self.inner.stack.insert(layer, before)
    }

    /// Remove a previously added layer.
    pub fn abandon(&self, layer: &Middleware) -> Result<(), Error> {
        self.inner.stack.abandon(layer)
    }

    /// Route `pattern` for every method, including ones without an alias.
    pub fn handle<H>(&self, pattern: &str, handler: H) -> Result<(), Error>
    where
        H: Handler + 'static,
    {
        self.handle_methods(pattern, MethodSet::ALL, handler)
    }

    /// Route `pattern` for the given methods.
    pub fn handle_methods<H>(&self, pattern: &str, methods: MethodSet, handler: H) -> Result<(), Error>
    where
        H: Handler + 'static,
    {
        let pattern = Pattern::parse(pattern)?;
        self.inner.router.handle(pattern, methods, Arc::new(handler));
        self.inner.stack.invalidate();
        Ok(())
    }

    method_aliases! {
        connect => CONNECT,
        delete => DELETE,
        get => GET,
        head => HEAD,
        options => OPTIONS,
        patch => PATCH,
        post => POST,
        put => PUT,
        trace => TRACE,
    }

    /// Replace the handler for requests no route takes.
    pub fn not_found<H>(&self, handler: H)
    where
        H: Handler + 'static,
    {
        let handler: BoxHandler = Arc::new(handler);
        self.inner.router.set_not_found(handler);
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn stack(&self) -> &MiddlewareStack {
        &self.inner.stack
    }

    /// Run one request through the middleware and the router.
    ///
    /// If a handler panics the chain in use is dropped, not pooled.
    pub fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        let instance = self.inner.stack.alloc();
        instance.serve(cx, w, req);
        self.inner.stack.release(instance);
    }

    /// An `axum::Router` serving this mux, with request bodies capped at
    /// `max_body_bytes`.
    pub fn into_router(self, max_body_bytes: usize) -> axum::Router {
        service::router(self, max_body_bytes, CancellationToken::new())
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for Mux {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        Mux::serve(self, cx, w, req)
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("router", &self.inner.router)
            .field("stack", &self.inner.stack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use axum::body::Bytes;
    use axum::http::{header, Method, StatusCode};

    use crate::http::handler_fn;
    use crate::middleware::sub_router;

    fn request(method: Method, uri: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    fn serve(mux: &Mux, method: Method, uri: &str) -> ResponseWriter {
        let mut w = ResponseWriter::new();
        mux.serve(&Context::background(), &mut w, &request(method, uri));
        w
    }

    fn hello() -> impl Handler {
        handler_fn(|cx: &Context, w: &mut ResponseWriter, _: &Request| {
            w.write_body(format!("Hello, {}", cx.param("name").unwrap_or("?")));
        })
    }

    #[test]
    fn test_hello_world() {
        let mux = Mux::new();
        mux.get("/hello/:name", hello()).unwrap();

        let w = serve(&mux, Method::GET, "/hello/world");
        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.body(), b"Hello, world");

        let w = serve(&mux, Method::POST, "/hello/world");
        assert_eq!(w.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(w.headers().get(header::ALLOW).unwrap(), "GET");

        assert_eq!(serve(&mux, Method::GET, "/nope").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_template_rejected() {
        let mux = Mux::new();
        assert!(matches!(mux.get("", hello()), Err(Error::Configuration { .. })));
        assert!(matches!(mux.get("nope", hello()), Err(Error::Configuration { .. })));
        assert!(mux.router().routes().is_empty());
    }

    #[test]
    fn test_handle_accepts_unknown_method() {
        let mux = Mux::new();
        mux.handle("/any", hello()).unwrap();
        let method = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(serve(&mux, method, "/any").status(), StatusCode::OK);
    }

    #[test]
    fn test_options_unions_methods() {
        let mux = Mux::new();
        mux.get("/r/:id", hello()).unwrap();
        mux.delete("/r/:id", hello()).unwrap();
        mux.patch("/r/*", hello()).unwrap();

        let w = serve(&mux, Method::OPTIONS, "/r/1");
        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.headers().get(header::ALLOW).unwrap(), "DELETE, GET, PATCH");
    }

    #[test]
    fn test_registration_invalidates_pool() {
        let mux = Mux::new();
        let before = mux.stack().generation();
        mux.get("/a", hello()).unwrap();
        assert!(mux.stack().generation() > before);

        serve(&mux, Method::GET, "/a");
        assert_eq!(mux.stack().idle(), 1);
        mux.get("/b", hello()).unwrap();
        assert_eq!(mux.stack().idle(), 0);
    }

    #[test]
    fn test_panicking_handler_drops_chain() {
        let mux = Mux::new();
        mux.get(
            "/boom",
            handler_fn(|_: &Context, _: &mut ResponseWriter, _: &Request| panic!("boom")),
        )
        .unwrap();
        mux.get("/ok", hello()).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| serve(&mux, Method::GET, "/boom")));
        assert!(result.is_err());
        assert_eq!(mux.stack().idle(), 0);

        assert_eq!(serve(&mux, Method::GET, "/ok").status(), StatusCode::OK);
    }

    #[test]
    fn test_nested_mux_under_wildcard() {
        let api = Mux::new();
        api.use_layer(sub_router());
        api.get("/users/:name", hello()).unwrap();

        let root = Mux::new();
        root.handle("/api/*", api).unwrap();

        let w = serve(&root, Method::GET, "/api/users/ada");
        assert_eq!(w.body(), b"Hello, ada");
        assert_eq!(serve(&root, Method::GET, "/api/other").status(), StatusCode::NOT_FOUND);
    }
}
