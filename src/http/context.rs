//! Request context.
//!
//! A `Context` carries a cancellation token plus an immutable chain of
//! typed values. Layers pass it on untouched or derive a child with one more
//! value; the child shares the parent's token, so cancellation always reaches
//! the innermost handler.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::routing::method::MethodSet;
use crate::routing::pattern::Params;

struct Root {
    token: CancellationToken,
}

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Entry>>,
}

/// Cancellation-aware, value-bearing request context. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    root: Arc<Root>,
    values: Option<Arc<Entry>>,
}

impl Context {
    /// A context that is only cancelled through its own token.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn new(token: CancellationToken) -> Self {
        Self {
            root: Arc::new(Root { token }),
            values: None,
        }
    }

    /// Derive a context that also carries `value`. The newest value of a
    /// given type shadows older ones.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Context {
        Context {
            root: self.root.clone(),
            values: Some(Arc::new(Entry {
                value: Box::new(value),
                parent: self.values.clone(),
            })),
        }
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        let mut entry = self.values.as_deref();
        while let Some(e) = entry {
            if let Some(v) = e.value.downcast_ref::<T>() {
                return Some(v);
            }
            entry = e.parent.as_deref();
        }
        None
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.root.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.root.token.is_cancelled()
    }

    /// True if both handles are the same context: same root and same
    /// values, not merely equal ones.
    pub fn ptr_eq(a: &Context, b: &Context) -> bool {
        let same_values = match (&a.values, &b.values) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            (None, None) => true,
            _ => false,
        };
        Arc::ptr_eq(&a.root, &b.root) && same_values
    }

    /// Bindings of the matched route, if it had any.
    pub fn params(&self) -> Option<&Params> {
        self.value::<Params>()
    }

    /// Shorthand for one binding of the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params().and_then(|p| p.get(name))
    }

    /// Methods the path would have accepted, set for the not-found handler
    /// when the path matched some route but the method did not.
    pub fn allowed_methods(&self) -> Option<MethodSet> {
        self.value::<AllowedMethods>().map(|a| a.0)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut entry = self.values.as_deref();
        while let Some(e) = entry {
            depth += 1;
            entry = e.parent.as_deref();
        }
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("values", &depth)
            .finish()
    }
}

/// Context value handed to the not-found handler on a method mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedMethods(pub MethodSet);
