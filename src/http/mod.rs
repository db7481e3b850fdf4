//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful drain)
//!     → service.rs (buffer body, build Context, hop to the blocking pool)
//!     → Mux (middleware chain → router → handler)
//!     → response.rs (ResponseWriter turned into an axum Response)
//!     → Send to client
//! ```

pub mod context;
pub mod handler;
pub mod response;
pub mod server;
pub mod service;

pub use context::{AllowedMethods, Context};
pub use handler::{
    handler_fn, http_handler_fn, wrap_http, BoxHandler, BoxHttpHandler, Handler, HttpHandler,
    HttpWrap, Request,
};
pub use response::ResponseWriter;
pub use server::HttpServer;
