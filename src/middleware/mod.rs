//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration:
//!     use_layer / insert / abandon
//!     → stack.rs (new layer list, new generation, fresh pool)
//!
//! Per request:
//!     pool.rs (take a built chain, or build one)
//!     → layer 0 → layer 1 → ... → router
//!     → pool.rs (reset context slot, return chain if generation still current)
//! ```
//!
//! # Design Decisions
//! - Three layer shapes, one closed enum; every shape is normalized to
//!   "handler wraps handler" when a chain is built
//! - Layers are identified by pointer, so callers keep the `Middleware`
//!   value they registered to insert before or abandon it later
//! - Changing the layer list or the routes starts a new pool generation;
//!   chains from older generations are dropped on release

pub mod pool;
pub mod request_id;
pub mod stack;
pub mod sub_router;

use std::fmt;
use std::sync::Arc;

use crate::http::{BoxHandler, BoxHttpHandler, Context, Handler, Request, ResponseWriter};

pub use request_id::{request_id, RequestId, X_REQUEST_ID};
pub use stack::{MiddlewareStack, StackInstance};
pub use sub_router::sub_router;

type HttpLayerFn = dyn Fn(BoxHttpHandler) -> BoxHttpHandler + Send + Sync;
type ContextualLayerFn = dyn Fn(BoxHandler) -> BoxHandler + Send + Sync;
type NextLayerFn = dyn Fn(&Context, &mut ResponseWriter, &Request, &dyn Handler) + Send + Sync;

/// One middleware layer.
#[derive(Clone)]
pub enum Middleware {
    /// Wraps a context-free handler. The chain saves the context before the
    /// layer runs and restores it for the handler the layer calls.
    Http(Arc<HttpLayerFn>),
    /// Wraps a context-aware handler.
    Contextual(Arc<ContextualLayerFn>),
    /// Runs with the request and an explicit `next` handler.
    Next(Arc<NextLayerFn>),
}

impl Middleware {
    pub fn http<F>(wrap: F) -> Self
    where
        F: Fn(BoxHttpHandler) -> BoxHttpHandler + Send + Sync + 'static,
    {
        Middleware::Http(Arc::new(wrap))
    }

    pub fn contextual<F>(wrap: F) -> Self
    where
        F: Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static,
    {
        Middleware::Contextual(Arc::new(wrap))
    }

    pub fn with_next<F>(f: F) -> Self
    where
        F: Fn(&Context, &mut ResponseWriter, &Request, &dyn Handler) + Send + Sync + 'static,
    {
        Middleware::Next(Arc::new(f))
    }

    /// True if both values refer to the same registered layer.
    pub fn same_layer(&self, other: &Middleware) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    fn as_ptr(&self) -> *const () {
        match self {
            Middleware::Http(f) => Arc::as_ptr(f) as *const (),
            Middleware::Contextual(f) => Arc::as_ptr(f) as *const (),
            Middleware::Next(f) => Arc::as_ptr(f) as *const (),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Middleware::Http(_) => "http",
            Middleware::Contextual(_) => "contextual",
            Middleware::Next(_) => "next",
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware::{}({:p})", self.kind(), self.as_ptr())
    }
}
