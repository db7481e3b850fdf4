//! Handler contract.
//!
//! A handler takes the request context, a response sink and the request,
//! and returns nothing: all of its output goes through the sink.
//!
//! Closures work directly where the parameter is bounded by `Fn`; where
//! inference needs help, wrap them in `handler_fn` / `http_handler_fn`.

use std::sync::Arc;

use axum::body::Bytes;

use crate::http::context::Context;
use crate::http::response::ResponseWriter;

/// A fully buffered request.
pub type Request = axum::http::Request<Bytes>;

/// A context-aware request handler.
pub trait Handler: Send + Sync {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request);
}

pub type BoxHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: Fn(&Context, &mut ResponseWriter, &Request) + Send + Sync,
{
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        self(cx, w, req)
    }
}

/// A handler that never looks at the context.
pub trait HttpHandler: Send + Sync {
    fn serve_http(&self, w: &mut ResponseWriter, req: &Request);
}

pub type BoxHttpHandler = Arc<dyn HttpHandler>;

impl<F> HttpHandler for F
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync,
{
    fn serve_http(&self, w: &mut ResponseWriter, req: &Request) {
        self(w, req)
    }
}

/// Pin a closure to the `Handler` signature.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&Context, &mut ResponseWriter, &Request) + Send + Sync,
{
    f
}

/// Pin a closure to the `HttpHandler` signature.
pub fn http_handler_fn<F>(f: F) -> F
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync,
{
    f
}

/// Adapts an `HttpHandler` to `Handler` by dropping the context.
pub struct HttpWrap<H>(pub H);

impl<H: HttpHandler> Handler for HttpWrap<H> {
    fn serve(&self, _cx: &Context, w: &mut ResponseWriter, req: &Request) {
        self.0.serve_http(w, req)
    }
}

pub fn wrap_http<H: HttpHandler>(handler: H) -> HttpWrap<H> {
    HttpWrap(handler)
}
