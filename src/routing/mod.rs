//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     template → pattern.rs (parse, validate)
//!     → table.rs (insert at prefix group, new snapshot)
//!     → router.rs (publish snapshot, drop compiled automaton)
//!
//! First request after a change:
//!     table snapshot → compiler.rs → automaton.rs (jump table)
//!
//! Per request:
//!     automaton.rs (walk bytes, try route candidates in table order)
//!     → matched handler, or not-found with the allowed methods
//! ```
//!
//! # Design Decisions
//! - No regex anywhere; templates are literal fragments and named captures
//! - Deterministic: first-registered route wins inside a prefix group
//! - Snapshots are immutable; a compiled automaton serves until replaced

pub mod automaton;
pub mod compiler;
pub mod method;
pub mod pattern;
pub mod router;
pub mod table;

pub use automaton::{Automaton, Resolution};
pub use method::MethodSet;
pub use pattern::{Params, Pattern};
pub use router::{default_not_found, Router};
pub use table::{Route, RouteTable};
