//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → subscribers (HTTP server) stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: in-flight requests are cancelled after the
//!   drain deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
