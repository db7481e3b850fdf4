//! Errors raised while configuring a mux.
//!
//! Nothing on the request path returns an error: a path that matches no
//! route is an ordinary outcome handed to the not-found handler.

/// Error type for route registration and middleware management.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A route template could not be compiled.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    Configuration {
        pattern: String,
        reason: &'static str,
    },

    /// `insert`/`abandon` was given a layer that is not in the stack.
    #[error("unknown middleware layer")]
    LayerNotFound,
}

impl Error {
    pub(crate) fn configuration(pattern: &str, reason: &'static str) -> Self {
        Error::Configuration {
            pattern: pattern.to_string(),
            reason,
        }
    }
}
