//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging through `tracing`; every subsystem logs with fields
//! - Request ID flows through the context (`middleware::request_id`)

pub mod logging;
