//! A request router that compiles path templates into a jump-table
//! automaton, with a pooled middleware stack in front of it.
//!
//! ```text
//! request → middleware chain (pooled) → router → automaton → handler
//!                                             ↘ not-found (404 / 405 / OPTIONS)
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod mux;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use error::Error;
pub use http::{
    handler_fn, http_handler_fn, wrap_http, AllowedMethods, Context, Handler, HttpHandler,
    HttpServer, Request, ResponseWriter,
};
pub use lifecycle::Shutdown;
pub use middleware::{request_id, sub_router, Middleware, RequestId};
pub use mux::Mux;
pub use routing::{MethodSet, Params, Pattern};
